//! Service layer
//!
//! Client-side state and orchestration on top of the gateway:
//! paginated feed, per-prompt actions, session votes and filters,
//! plus the top prompts view, follows and submission.

mod actions;
mod feed;
mod filters;
mod follow;
mod pagination;
mod submission;
mod top;
mod votes;

pub use actions::{ActionTracker, PromptAction, UpdateCallback};
pub use feed::{PromptFeed, PromptPages, VoteOutcome};
pub use filters::{FilterPatch, FilterStore};
pub use follow::FollowService;
pub use pagination::{FetchOutcome, PageSnapshot, PageSource, PaginatedQuery};
pub use submission::{PromptSubmission, SubmissionService, build_tags};
pub use top::TopPromptsView;
pub use votes::{SessionVote, SessionVoteLedger, VoteStatus, load_or_create_session_id};
