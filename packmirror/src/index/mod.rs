//! Root index parsing, change detection and working-set expansion.

mod change;
mod expand;
mod root;

pub use change::{ChangeDetector, ChangeStatus};
pub use expand::{
    expand_packages, expand_providers, expand_template, normalize_path, Resource, WorkingSet,
};
pub use root::{ProviderReference, RootIndex, DEFAULT_PROVIDERS_URL};
