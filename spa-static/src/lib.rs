pub mod provider;
pub mod router;

pub use provider::{
    select_provider, ContentProvider, EmbeddedProvider, FrontendAssets, FsProvider, LoadFuture,
};
pub use router::{plan, routes, serve_asset, AssetPlan, StaticState};
