use crate::action::{Action, ActionContext, ActionFuture, ActionResponse};

/// `get_version`: build metadata, no authentication.
pub struct GetVersion;

impl Action for GetVersion {
    fn name(&self) -> &str {
        "get_version"
    }

    fn invoke(&self, ctx: ActionContext) -> ActionFuture<'_> {
        Box::pin(async move { Ok(ActionResponse::json(ctx.build_info.as_ref().clone())) })
    }
}
