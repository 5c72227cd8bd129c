//! Tool Router - builds the rmcp ToolRouter.
//!
//! Used by the STDIO/TCP transports. Each tool knows how to create its own
//! route.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use super::definitions::ListFilesTool;
use crate::domains::files::DirectoryLister;

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(lister: Arc<DirectoryLister>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new().with_route(ListFilesTool::create_route(lister))
}
