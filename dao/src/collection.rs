use od_error::AccessError;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// Fields the `search` filter may match against, in preference order.
pub const SEARCH_CANDIDATES: [&str; 3] = ["name", "title", "description"];

/// Every record collection the console reads and writes. A new collection
/// needs a permission subject and a scoping decision below.
#[derive(Deserialize, Serialize, EnumIter, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    BusinessDirectory,
    Zones,
    Services,
    Content,
    GrowthAreas,
    Organizations,
    Profiles,
    AnalyticsEvents,
}

impl Collection {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::BusinessDirectory => "business_directory",
            Self::Zones => "zones",
            Self::Services => "services",
            Self::Content => "content",
            Self::GrowthAreas => "growth_areas",
            Self::Organizations => "organizations",
            Self::Profiles => "profiles",
            Self::AnalyticsEvents => "analytics_events",
        }
    }

    pub fn from_str(str: &str) -> Result<Self, AccessError> {
        match str {
            "business_directory" => Ok(Self::BusinessDirectory),
            "zones" => Ok(Self::Zones),
            "services" => Ok(Self::Services),
            "content" => Ok(Self::Content),
            "growth_areas" => Ok(Self::GrowthAreas),
            "organizations" => Ok(Self::Organizations),
            "profiles" => Ok(Self::Profiles),
            "analytics_events" => Ok(Self::AnalyticsEvents),
            _ => Err(AccessError::UnknownCollection(str.to_owned())),
        }
    }

    pub fn subject(&self) -> SubjectType {
        match self {
            Self::BusinessDirectory => SubjectType::Business,
            Self::Zones => SubjectType::Zone,
            Self::Services => SubjectType::Service,
            Self::Content => SubjectType::Content,
            Self::GrowthAreas => SubjectType::GrowthArea,
            Self::Organizations => SubjectType::Organization,
            Self::Profiles => SubjectType::User,
            Self::AnalyticsEvents => SubjectType::Analytics,
        }
    }

    /// Whether reads and writes of external callers are confined to their
    /// own organization.
    pub fn is_organization_scoped(&self) -> bool {
        match self {
            Self::BusinessDirectory
            | Self::Services
            | Self::Content
            | Self::GrowthAreas
            | Self::Profiles
            | Self::AnalyticsEvents => true,
            Self::Zones | Self::Organizations => false,
        }
    }

    /// The subset of [`SEARCH_CANDIDATES`] this collection carries, in
    /// candidate order.
    pub fn search_fields(&self) -> &'static [&'static str] {
        match self {
            Self::BusinessDirectory | Self::Zones | Self::Services | Self::GrowthAreas => {
                &["name", "description"]
            }
            Self::Content => &["title", "description"],
            Self::Organizations | Self::Profiles | Self::AnalyticsEvents => &["name"],
        }
    }
}

/// Permission-domain label capability rules are written against.
#[derive(Deserialize, Serialize, EnumIter, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SubjectType {
    /// Wildcard used by rules only; no collection maps to it.
    All,
    Business,
    Zone,
    Service,
    Content,
    GrowthArea,
    Organization,
    User,
    Analytics,
}

impl SubjectType {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Business => "Business",
            Self::Zone => "Zone",
            Self::Service => "Service",
            Self::Content => "Content",
            Self::GrowthArea => "GrowthArea",
            Self::Organization => "Organization",
            Self::User => "User",
            Self::Analytics => "Analytics",
        }
    }

    pub fn from_str(str: &str) -> Result<Self, AccessError> {
        match str {
            "all" => Ok(Self::All),
            "Business" => Ok(Self::Business),
            "Zone" => Ok(Self::Zone),
            "Service" => Ok(Self::Service),
            "Content" => Ok(Self::Content),
            "GrowthArea" => Ok(Self::GrowthArea),
            "Organization" => Ok(Self::Organization),
            "User" => Ok(Self::User),
            "Analytics" => Ok(Self::Analytics),
            _ => Err(AccessError::UnknownSubject(str.to_owned())),
        }
    }
}
