pub use in_memory_catalog_registry::InMemoryCatalogRegistry;

use chrono::{Local, NaiveDate};

use crate::api::{Book, BookDetails, LoanRecord, Member, MemberDetails};

mod in_memory_catalog_registry;

/// Source of the current calendar date, injected into the registry so that
/// borrow dates and the overdue predicate are deterministic under test.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// The catalog registry owns books, members and the active loan list, and is
/// the only mutator of any of them.
///
/// Mutating operations report success as a plain boolean and perform no
/// mutation at all on failure; lookups report "not found" as `None`. Callers
/// that need to know why an operation failed re-query state through the
/// lookups.
#[async_trait::async_trait]
pub trait CatalogRegistry: Send + Sync {
    /// Adds a book keyed by its ISBN. A duplicate ISBN is silently ignored so
    /// that at most one book exists per ISBN.
    async fn add_book(&self, details: BookDetails);
    /// Removes the book with the given ISBN, returns whether a deletion
    /// occurred. Removing a borrowed book also retires its active loan.
    async fn remove_book(&self, isbn: &str) -> bool;
    /// Looks up a single book by ISBN.
    async fn find_book(&self, isbn: &str) -> Option<Book>;
    /// Case-insensitive substring search over title, author and genre.
    /// A blank query matches nothing.
    async fn search_books(&self, query: &str) -> Vec<Book>;
    /// Lists every book in the catalog, in no particular order.
    async fn list_books(&self) -> Vec<Book>;
    /// Registers a member keyed by user id. A duplicate id is silently
    /// ignored and the second registration's fields are discarded.
    async fn register_user(&self, details: MemberDetails);
    /// Looks up a single member by user id.
    async fn find_user(&self, user_id: &str) -> Option<Member>;
    /// Lists every registered member, in no particular order.
    async fn list_users(&self) -> Vec<Member>;
    /// Lends the book to the member. Fails if either is unknown, the book is
    /// already borrowed, or the member is at their borrowing limit.
    async fn borrow_book(&self, user_id: &str, isbn: &str) -> bool;
    /// Takes the book back from the member. Fails if either is unknown, the
    /// book is not currently borrowed, or this member is not the holder.
    async fn return_book(&self, user_id: &str, isbn: &str) -> bool;
    /// Active loans whose due date has passed, in loan-creation order.
    async fn get_overdue_books(&self) -> Vec<LoanRecord>;
}
