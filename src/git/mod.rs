pub mod diff;
pub mod history;
pub mod reader;
pub mod repository;

pub use reader::RepositoryReader;
pub use repository::GitRepository;
