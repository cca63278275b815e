//! CSP compliance for harvested photos.
//!
//! Photo origins are checked against the `img-src` allow-list of the
//! directory app's policy file. In remediate mode missing origins are
//! appended to that file; in drop mode offending photos are removed.

mod allowlist;
mod engine;
mod policy;
mod store;

pub use allowlist::{AllowList, origin_of};
pub use engine::{CspEngine, CspOutcome, ValidationReport, Violation, validate};
pub use policy::PolicyDocument;
pub use store::{FilePolicyStore, MemoryPolicyStore, PolicyStore};

pub(crate) use vanbuilder_shared::Result;
