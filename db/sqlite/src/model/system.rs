/// Comparison operators the record filters are rendered with.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
}

impl ComparisonOperator {
    pub fn to_str(&self) -> &str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "GLOB",
            Self::ILike => "LIKE",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum OrderKind {
    Asc,
    Desc,
}

impl OrderKind {
    pub fn to_str(&self) -> &str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}
