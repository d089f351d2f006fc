use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type Isbn = String;
pub type UserId = String;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub isbn: Isbn,
    pub genre: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub isbn: Isbn,
    pub genre: String,
    pub available: bool,
}

impl Book {
    pub fn new(details: BookDetails) -> Self {
        Self {
            title: details.title,
            author: details.author,
            isbn: details.isbn,
            genre: details.genre,
            available: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Student,
    Faculty,
    Guest,
}

impl UserType {
    /// Borrowing policy fixed by the member type.
    pub fn policy(self) -> BorrowPolicy {
        match self {
            UserType::Student => BorrowPolicy {
                max_books: 3,
                loan_days: 14,
                fine_per_day: 0.50,
            },
            UserType::Faculty => BorrowPolicy {
                max_books: 10,
                loan_days: 30,
                fine_per_day: 0.00,
            },
            UserType::Guest => BorrowPolicy {
                max_books: 1,
                loan_days: 7,
                fine_per_day: 1.00,
            },
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Student => write!(f, "STUDENT"),
            UserType::Faculty => write!(f, "FACULTY"),
            UserType::Guest => write!(f, "GUEST"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown user type: {0}")]
pub struct UnknownUserType(pub String);

impl FromStr for UserType {
    type Err = UnknownUserType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(UserType::Student),
            "faculty" => Ok(UserType::Faculty),
            "guest" => Ok(UserType::Guest),
            other => Err(UnknownUserType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BorrowPolicy {
    pub max_books: usize,
    pub loan_days: i64,
    pub fine_per_day: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct MemberDetails {
    pub name: String,
    pub user_id: UserId,
    pub email: String,
    pub user_type: UserType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub name: String,
    pub user_id: UserId,
    pub email: String,
    pub user_type: UserType,
    pub policy: BorrowPolicy,
    pub held_books: HashSet<Isbn>,
}

impl Member {
    pub fn new(details: MemberDetails) -> Self {
        Self {
            name: details.name,
            user_id: details.user_id,
            email: details.email,
            user_type: details.user_type,
            // resolved once at construction, the type never changes
            policy: details.user_type.policy(),
            held_books: HashSet::new(),
        }
    }

    pub fn can_borrow(&self) -> bool {
        self.held_books.len() < self.policy.max_books
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct LoanRecord {
    pub user_id: UserId,
    pub isbn: Isbn,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl LoanRecord {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        today > self.due_date
    }
}
