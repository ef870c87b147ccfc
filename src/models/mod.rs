//! Data transfer objects shared by the core and the HTTP layer.
//!
//! These structs are serialized to JSON for the web layer.
//! - `account`: Account, the resolved identity behind an email or handle
//! - `commit`: Commit, AuthorInfo, HistoryPage
//! - `diff`: DiffResult, DiffFile, DiffHunk, DiffLine, CommitDiffView, RangeDiffView
//! - `comment`: CommentAnchor, Comment, RenderedComment, ActivityEvent, MailPayload

pub mod account;
pub mod comment;
pub mod commit;
pub mod diff;

pub use account::*;
pub use comment::*;
pub use commit::*;
pub use diff::*;
