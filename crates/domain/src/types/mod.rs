//! Domain data types

pub mod organization;
pub mod partner;
pub mod reference;
pub mod resource;
pub mod token;

pub use organization::{slugify, tenant_key, Organization, TargetUrlStrategy};
pub use partner::{Partner, Strategy};
pub use reference::{Identifier, ResourceReference};
pub use resource::ResourceRecord;
pub use token::{TokenResponse, TokenSet};
