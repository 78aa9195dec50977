mod promote;
mod prune_tokens;

pub use promote::cmd_promote;
pub use prune_tokens::cmd_prune_tokens;
