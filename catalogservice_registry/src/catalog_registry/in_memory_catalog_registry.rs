use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{Book, BookDetails, Isbn, LoanRecord, Member, MemberDetails, UserId};
use crate::catalog_registry::{CatalogRegistry, Clock, SystemClock};

#[derive(Default)]
struct CatalogState {
    books: HashMap<Isbn, Book>,
    members: HashMap<UserId, Member>,
    // chronological: borrow pushes to the back
    loans: Vec<LoanRecord>,
}

pub struct InMemoryCatalogRegistry {
    // One lock over the whole state: borrow/return invariants span books,
    // members and loans, so per-collection locks would not be enough.
    state: parking_lot::RwLock<CatalogState>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryCatalogRegistry {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl InMemoryCatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Default::default(),
            clock,
        }
    }
}

#[async_trait::async_trait]
impl CatalogRegistry for InMemoryCatalogRegistry {
    async fn add_book(&self, details: BookDetails) {
        let mut state = self.state.write();
        match state.books.entry(details.isbn.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(isbn = %details.isbn, "duplicate isbn, add ignored");
            }
            Entry::Vacant(entry) => {
                tracing::debug!(isbn = %details.isbn, "book added");
                entry.insert(Book::new(details));
            }
        }
    }

    async fn remove_book(&self, isbn: &str) -> bool {
        let mut state = self.state.write();
        let Some(book) = state.books.remove(isbn) else {
            return false;
        };
        if !book.available {
            // The book is on loan; retire the record and release the holder
            // so no loan points at a missing book.
            if let Some(position) = state.loans.iter().position(|record| record.isbn == isbn) {
                let record = state.loans.remove(position);
                if let Some(member) = state.members.get_mut(&record.user_id) {
                    member.held_books.remove(isbn);
                }
                tracing::debug!(isbn, user_id = %record.user_id, "retired loan of removed book");
            }
        }
        tracing::debug!(isbn, "book removed");
        true
    }

    async fn find_book(&self, isbn: &str) -> Option<Book> {
        self.state.read().books.get(isbn).cloned()
    }

    async fn search_books(&self, query: &str) -> Vec<Book> {
        let search_term = query.trim().to_lowercase();
        if search_term.is_empty() {
            return Vec::new();
        }

        self.state
            .read()
            .books
            .values()
            .filter(|book| {
                book.title.to_lowercase().contains(&search_term)
                    || book.author.to_lowercase().contains(&search_term)
                    || book.genre.to_lowercase().contains(&search_term)
            })
            .cloned()
            .collect()
    }

    async fn list_books(&self) -> Vec<Book> {
        self.state.read().books.values().cloned().collect()
    }

    async fn register_user(&self, details: MemberDetails) {
        let mut state = self.state.write();
        match state.members.entry(details.user_id.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(user_id = %details.user_id, "duplicate user id, registration ignored");
            }
            Entry::Vacant(entry) => {
                tracing::debug!(user_id = %details.user_id, user_type = %details.user_type, "member registered");
                entry.insert(Member::new(details));
            }
        }
    }

    async fn find_user(&self, user_id: &str) -> Option<Member> {
        self.state.read().members.get(user_id).cloned()
    }

    async fn list_users(&self) -> Vec<Member> {
        self.state.read().members.values().cloned().collect()
    }

    async fn borrow_book(&self, user_id: &str, isbn: &str) -> bool {
        let mut state = self.state.write();
        let state = &mut *state;

        let (Some(member), Some(book)) =
            (state.members.get_mut(user_id), state.books.get_mut(isbn))
        else {
            tracing::debug!(user_id, isbn, "borrow rejected: unknown user or book");
            return false;
        };
        if !book.available {
            tracing::debug!(user_id, isbn, "borrow rejected: book unavailable");
            return false;
        }
        if !member.can_borrow() {
            tracing::debug!(user_id, isbn, "borrow rejected: member at limit");
            return false;
        }

        book.available = false;
        member.held_books.insert(book.isbn.clone());
        let borrow_date = self.clock.today();
        state.loans.push(LoanRecord {
            user_id: member.user_id.clone(),
            isbn: book.isbn.clone(),
            borrow_date,
            due_date: borrow_date + chrono::Duration::days(member.policy.loan_days),
        });
        tracing::debug!(user_id, isbn, "book borrowed");
        true
    }

    async fn return_book(&self, user_id: &str, isbn: &str) -> bool {
        let mut state = self.state.write();
        let state = &mut *state;

        let (Some(member), Some(book)) =
            (state.members.get_mut(user_id), state.books.get_mut(isbn))
        else {
            tracing::debug!(user_id, isbn, "return rejected: unknown user or book");
            return false;
        };
        if book.available {
            tracing::debug!(user_id, isbn, "return rejected: book not on loan");
            return false;
        }
        if !member.held_books.remove(isbn) {
            tracing::debug!(user_id, isbn, "return rejected: member does not hold the book");
            return false;
        }

        book.available = true;
        // The availability check above guarantees at most one active loan per
        // ISBN, so matching on ISBN alone is sufficient.
        state.loans.retain(|record| record.isbn != isbn);
        tracing::debug!(user_id, isbn, "book returned");
        true
    }

    async fn get_overdue_books(&self) -> Vec<LoanRecord> {
        let today = self.clock.today();
        self.state
            .read()
            .loans
            .iter()
            .filter(|record| record.is_overdue(today))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod in_memory_catalog_registry_tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use crate::api::{BookDetails, MemberDetails, UserType};
    use crate::catalog_registry::{CatalogRegistry, Clock, InMemoryCatalogRegistry};

    /// Clock stuck on a settable date, so overdue tests do not depend on the
    /// wall clock.
    struct TestClock {
        today: parking_lot::RwLock<NaiveDate>,
    }

    impl TestClock {
        fn starting_at(date: NaiveDate) -> Arc<Self> {
            Arc::new(Self {
                today: parking_lot::RwLock::new(date),
            })
        }

        fn set(&self, date: NaiveDate) {
            *self.today.write() = date;
        }
    }

    impl Clock for TestClock {
        fn today(&self) -> NaiveDate {
            *self.today.read()
        }
    }

    fn book_details(isbn: &str) -> BookDetails {
        BookDetails {
            title: format!("Title {isbn}"),
            author: "Author".to_string(),
            isbn: isbn.to_string(),
            genre: "Genre".to_string(),
        }
    }

    fn member_details(user_id: &str, user_type: UserType) -> MemberDetails {
        MemberDetails {
            name: format!("Name of {user_id}"),
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            user_type,
        }
    }

    #[tokio::test]
    /// Tests book management in one combined case to avoid duplicate setup
    /// 1. Finds a book in the empty registry - expects None
    /// 2. Adds a book and finds it, available by default
    /// 3. Adds a second book with the same isbn - expects the first to stay
    /// 4. Removes the book, removal of the same isbn again fails
    async fn test_add_find_and_remove_book() {
        let registry = InMemoryCatalogRegistry::new();

        assert!(registry.find_book("111").await.is_none());
        assert_eq!(registry.list_books().await, vec![]);

        registry.add_book(book_details("111")).await;

        let book = registry.find_book("111").await.expect("Book not found");
        assert_eq!(book.title, "Title 111");
        assert!(book.available);
        assert_eq!(registry.list_books().await.len(), 1);

        let duplicate = BookDetails {
            title: "Different title".to_string(),
            ..book_details("111")
        };
        registry.add_book(duplicate).await;

        let book = registry.find_book("111").await.expect("Book not found");
        assert_eq!(book.title, "Title 111");
        assert_eq!(registry.list_books().await.len(), 1);

        assert!(registry.remove_book("111").await);
        assert!(registry.find_book("111").await.is_none());
        assert!(!registry.remove_book("111").await);
    }

    #[tokio::test]
    /// Tests search over title, author and genre
    /// 1. Blank and whitespace-only queries match nothing
    /// 2. Author match is case-insensitive
    /// 3. Title and genre are searched as well
    /// 4. A non-matching query returns an empty vec
    async fn test_search_books() {
        let registry = InMemoryCatalogRegistry::new();
        registry
            .add_book(BookDetails {
                title: "1984".to_string(),
                author: "George Orwell".to_string(),
                isbn: "9780451524935".to_string(),
                genre: "Dystopian".to_string(),
            })
            .await;
        registry
            .add_book(BookDetails {
                title: "The Hobbit".to_string(),
                author: "J.R.R. Tolkien".to_string(),
                isbn: "9780547928227".to_string(),
                genre: "Fantasy".to_string(),
            })
            .await;

        assert_eq!(registry.search_books("").await, vec![]);
        assert_eq!(registry.search_books("   ").await, vec![]);

        let by_author = registry.search_books("orwell").await;
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].isbn, "9780451524935");

        let by_title = registry.search_books("hobbit").await;
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].isbn, "9780547928227");

        let by_genre = registry.search_books("FANTASY").await;
        assert_eq!(by_genre.len(), 1);
        assert_eq!(by_genre[0].isbn, "9780547928227");

        assert_eq!(registry.search_books("cookbook").await, vec![]);
    }

    #[tokio::test]
    /// Tests member registration
    /// 1. Finds a member in the empty registry - expects None
    /// 2. Registers a member and finds them, no books held
    /// 3. Registers the same user id again - second registration is discarded
    async fn test_register_and_find_user() {
        let registry = InMemoryCatalogRegistry::new();

        assert!(registry.find_user("u1").await.is_none());
        assert_eq!(registry.list_users().await, vec![]);

        registry
            .register_user(member_details("u1", UserType::Student))
            .await;

        let member = registry.find_user("u1").await.expect("Member not found");
        assert_eq!(member.user_type, UserType::Student);
        assert_eq!(member.policy.max_books, 3);
        assert!(member.held_books.is_empty());

        let duplicate = MemberDetails {
            name: "Somebody Else".to_string(),
            ..member_details("u1", UserType::Faculty)
        };
        registry.register_user(duplicate).await;

        let member = registry.find_user("u1").await.expect("Member not found");
        assert_eq!(member.name, "Name of u1");
        assert_eq!(member.user_type, UserType::Student);
        assert_eq!(registry.list_users().await.len(), 1);
    }

    #[tokio::test]
    /// Tests the borrow/return cycle for a single member and book
    /// 1. Borrow fails for unknown user, unknown book
    /// 2. Borrow succeeds, book flips to unavailable, member holds it
    /// 3. Borrowing the same book again fails for everyone
    /// 4. Return by a non-holder fails without mutation
    /// 5. Return by the holder restores availability and empties the held set
    /// 6. Returning an available book fails
    async fn test_borrow_and_return_cycle() {
        let registry = InMemoryCatalogRegistry::new();
        registry.add_book(book_details("111")).await;
        registry
            .register_user(member_details("u1", UserType::Student))
            .await;
        registry
            .register_user(member_details("u2", UserType::Student))
            .await;

        assert!(!registry.borrow_book("nobody", "111").await);
        assert!(!registry.borrow_book("u1", "999").await);

        assert!(registry.borrow_book("u1", "111").await);
        let book = registry.find_book("111").await.unwrap();
        assert!(!book.available);
        let member = registry.find_user("u1").await.unwrap();
        assert!(member.held_books.contains("111"));

        assert!(!registry.borrow_book("u1", "111").await);
        assert!(!registry.borrow_book("u2", "111").await);

        assert!(!registry.return_book("u2", "111").await);
        let member = registry.find_user("u2").await.unwrap();
        assert!(member.held_books.is_empty());

        assert!(registry.return_book("u1", "111").await);
        let book = registry.find_book("111").await.unwrap();
        assert!(book.available);
        let member = registry.find_user("u1").await.unwrap();
        assert!(member.held_books.is_empty());

        assert!(!registry.return_book("u1", "111").await);
    }

    #[tokio::test]
    /// Tests the per-type borrowing limit
    /// 1. A student borrows three books
    /// 2. The fourth borrow is rejected and the held set is unchanged
    /// 3. Returning one book frees a slot again
    /// 4. A guest is limited to a single book
    async fn test_borrow_limit_enforced() {
        let registry = InMemoryCatalogRegistry::new();
        for isbn in ["111", "222", "333", "444"] {
            registry.add_book(book_details(isbn)).await;
        }
        registry
            .register_user(member_details("student", UserType::Student))
            .await;
        registry
            .register_user(member_details("guest", UserType::Guest))
            .await;

        assert!(registry.borrow_book("student", "111").await);
        assert!(registry.borrow_book("student", "222").await);
        assert!(registry.borrow_book("student", "333").await);

        assert!(!registry.borrow_book("student", "444").await);
        let member = registry.find_user("student").await.unwrap();
        assert_eq!(member.held_books.len(), 3);
        assert!(!member.can_borrow());
        let book = registry.find_book("444").await.unwrap();
        assert!(book.available);

        assert!(registry.return_book("student", "222").await);
        assert!(registry.borrow_book("student", "444").await);

        assert!(registry.borrow_book("guest", "222").await);
        assert!(!registry.borrow_book("guest", "333").await);
        let member = registry.find_user("guest").await.unwrap();
        assert_eq!(member.held_books.len(), 1);
    }

    #[tokio::test]
    /// Tests the overdue report against a fixed clock
    /// 1. Borrow a book as a student (14 day loan) on day zero
    /// 2. On the due date the loan is not overdue
    /// 3. One day past the due date it is
    /// 4. Records come back in loan-creation order
    /// 5. Returning the book clears it from the report
    async fn test_overdue_report() {
        let day_zero = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let clock = TestClock::starting_at(day_zero);
        let registry = InMemoryCatalogRegistry::with_clock(clock.clone());

        registry.add_book(book_details("111")).await;
        registry.add_book(book_details("222")).await;
        registry
            .register_user(member_details("u1", UserType::Student))
            .await;

        assert!(registry.borrow_book("u1", "111").await);
        clock.set(day_zero + chrono::Duration::days(1));
        assert!(registry.borrow_book("u1", "222").await);

        assert_eq!(registry.get_overdue_books().await, vec![]);

        // due date of the first loan, still not overdue
        clock.set(day_zero + chrono::Duration::days(14));
        assert_eq!(registry.get_overdue_books().await, vec![]);

        clock.set(day_zero + chrono::Duration::days(15));
        let overdue = registry.get_overdue_books().await;
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].isbn, "111");
        assert_eq!(overdue[0].borrow_date, day_zero);
        assert_eq!(overdue[0].due_date, day_zero + chrono::Duration::days(14));

        clock.set(day_zero + chrono::Duration::days(16));
        let overdue = registry.get_overdue_books().await;
        assert_eq!(overdue.len(), 2);
        assert_eq!(overdue[0].isbn, "111");
        assert_eq!(overdue[1].isbn, "222");

        assert!(registry.return_book("u1", "111").await);
        let overdue = registry.get_overdue_books().await;
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].isbn, "222");
    }

    #[tokio::test]
    /// Tests that removing a borrowed book retires its loan
    /// 1. Borrow a book, then remove it from the catalog
    /// 2. The holder's held set is released
    /// 3. No loan lingers in the overdue report, even far in the future
    /// 4. The freed slot can be used for another borrow
    async fn test_remove_borrowed_book_retires_loan() {
        let day_zero = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let clock = TestClock::starting_at(day_zero);
        let registry = InMemoryCatalogRegistry::with_clock(clock.clone());

        registry.add_book(book_details("111")).await;
        registry.add_book(book_details("222")).await;
        registry
            .register_user(member_details("guest", UserType::Guest))
            .await;

        assert!(registry.borrow_book("guest", "111").await);
        assert!(registry.remove_book("111").await);

        let member = registry.find_user("guest").await.unwrap();
        assert!(member.held_books.is_empty());

        clock.set(day_zero + chrono::Duration::days(365));
        assert_eq!(registry.get_overdue_books().await, vec![]);

        assert!(registry.borrow_book("guest", "222").await);
    }
}
