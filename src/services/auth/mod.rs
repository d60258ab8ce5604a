pub mod factory;
pub mod keys;
pub mod metadata;
pub mod scopes;
pub mod token;

pub use factory::{AuthServices, build_auth_services};
pub use keys::{JwksKeyResolver, KeyResolutionError, SigningKeyResolver};
pub use metadata::{AuthorizationServerMetadata, MetadataProvider, ProtectedResourceMetadata};
pub use scopes::{Scope, ScopeAuthorizer};
pub use token::{TokenError, TokenVerifier, VerifiedIdentity};
