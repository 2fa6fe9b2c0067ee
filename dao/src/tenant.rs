use od_config::tenant::TenantConfig;
use od_error::AccessError;
use serde_json::Value;

use crate::{collection::Collection, filter::Predicate, query::Record};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum UserSegment {
    /// Staff; never confined to an organization.
    Internal,
    External(String),
}

impl UserSegment {
    pub fn parse(raw: &str, internal_segment: &str) -> Self {
        match raw == internal_segment {
            true => Self::Internal,
            false => Self::External(raw.to_owned()),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Who is calling: handed to every controller explicitly.
#[derive(Clone, Debug)]
pub struct TenantContext {
    organization_id: Option<String>,
    user_id: Option<String>,
    segment: UserSegment,
}

impl TenantContext {
    pub fn new(
        organization_id: &Option<String>,
        user_id: &Option<String>,
        segment: &UserSegment,
    ) -> Self {
        Self {
            organization_id: organization_id.clone().filter(|id| !id.is_empty()),
            user_id: user_id.clone().filter(|id| !id.is_empty()),
            segment: segment.clone(),
        }
    }

    pub fn organization_id(&self) -> &Option<String> {
        &self.organization_id
    }

    pub fn user_id(&self) -> &Option<String> {
        &self.user_id
    }

    pub fn segment(&self) -> &UserSegment {
        &self.segment
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TenantScope {
    Unrestricted,
    Organization(String),
}

impl TenantScope {
    pub fn predicates(&self, organization_field: &str) -> Vec<Predicate> {
        match self {
            Self::Unrestricted => Vec::new(),
            Self::Organization(id) => vec![Predicate::eq(
                organization_field,
                Value::String(id.to_owned()),
            )],
        }
    }
}

#[derive(Clone)]
pub struct TenantPolicy {
    internal_segment: String,
    strict: bool,
    organization_field: String,
    creator_field: String,
}

impl TenantPolicy {
    pub fn new(config: &TenantConfig) -> Self {
        Self {
            internal_segment: config.internal_segment().to_owned(),
            strict: *config.strict(),
            organization_field: config.organization_field().to_owned(),
            creator_field: config.creator_field().to_owned(),
        }
    }

    pub fn segment(&self, raw: &str) -> UserSegment {
        UserSegment::parse(raw, &self.internal_segment)
    }

    pub fn organization_field(&self) -> &str {
        &self.organization_field
    }

    pub fn creator_field(&self) -> &str {
        &self.creator_field
    }

    /// Decides how reads of `collection` by `ctx` are confined.
    ///
    /// An external caller without an organization on a scoped collection is
    /// refused in strict mode; otherwise the read goes out unscoped and the
    /// degradation is logged.
    pub fn read_scope(
        &self,
        ctx: &TenantContext,
        collection: &Collection,
    ) -> Result<TenantScope, AccessError> {
        if ctx.segment().is_internal() || !collection.is_organization_scoped() {
            return Ok(TenantScope::Unrestricted);
        }
        match ctx.organization_id() {
            Some(id) => Ok(TenantScope::Organization(id.to_owned())),
            None if self.strict => Err(AccessError::tenant_unresolved(collection.to_str())),
            None => {
                od_log::warn(
                    "tenant",
                    format!(
                        "External caller {:?} has no organization; {} is served unscoped",
                        ctx.user_id(),
                        collection.to_str()
                    ),
                );
                Ok(TenantScope::Unrestricted)
            }
        }
    }

    /// Updates and deletes are confined exactly like reads.
    pub fn write_scope(
        &self,
        ctx: &TenantContext,
        collection: &Collection,
    ) -> Result<TenantScope, AccessError> {
        self.read_scope(ctx, collection)
    }

    /// Attributes a new record to its organization and creator.
    ///
    /// External callers always get their own organization written over any
    /// supplied value; staff may create on behalf of another organization, so
    /// their organization only fills a missing field.
    pub fn stamp_create(
        &self,
        ctx: &TenantContext,
        collection: &Collection,
        record: &mut Record,
    ) -> Result<(), AccessError> {
        let scope = self.write_scope(ctx, collection)?;
        let field = &self.organization_field;
        if collection.is_organization_scoped() {
            match (&scope, ctx.organization_id()) {
                (TenantScope::Organization(id), _) => {
                    record.insert(field.clone(), Value::String(id.to_owned()));
                }
                (TenantScope::Unrestricted, Some(id)) => {
                    if !record.get(field).is_some_and(|value| !value.is_null()) {
                        record.insert(field.clone(), Value::String(id.to_owned()));
                    }
                }
                (TenantScope::Unrestricted, None) => {}
            }
        }
        if let Some(user_id) = ctx.user_id() {
            record.insert(self.creator_field.clone(), Value::from(user_id.as_str()));
        }
        Ok(())
    }

    /// Strips fields an external caller must not rewrite on update.
    pub fn guard_patch(&self, ctx: &TenantContext, collection: &Collection, patch: &mut Record) {
        if !ctx.segment().is_internal() && collection.is_organization_scoped() {
            patch.remove(&self.organization_field);
        }
        patch.remove(&self.creator_field);
    }
}
