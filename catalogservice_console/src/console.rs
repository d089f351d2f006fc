use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;

use catalogservice_registry::api::{Book, BookDetails, MemberDetails, UserType};
use catalogservice_registry::catalog_registry::CatalogRegistry;

/// Interactive menu driver. All catalog state lives behind the registry; the
/// console only shuttles strings in and results out.
pub struct CatalogConsole {
    registry: Arc<dyn CatalogRegistry>,
}

impl CatalogConsole {
    pub fn new(registry: Arc<dyn CatalogRegistry>) -> Self {
        Self { registry }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        println!("=== Welcome to Library Management System ===");

        loop {
            println!();
            println!("=== Main Menu ===");
            println!("1. Book Management");
            println!("2. User Management");
            println!("3. Borrowing Operations");
            println!("4. View Overdue Books");
            println!("5. Search Books");
            println!("0. Exit");

            match self.read_choice("Enter choice: ")? {
                1 => self.handle_book_management().await?,
                2 => self.handle_user_management().await?,
                3 => self.handle_borrowing_operations().await?,
                4 => self.show_overdue_books().await,
                5 => self.search_books().await?,
                0 => {
                    println!("Goodbye!");
                    return Ok(());
                }
                _ => println!("Invalid choice. Please try again."),
            }
        }
    }

    async fn handle_book_management(&self) -> anyhow::Result<()> {
        loop {
            println!();
            println!("=== Book Management ===");
            println!("1. Add Book");
            println!("2. Remove Book");
            println!("3. View All Books");
            println!("0. Back to Main Menu");

            match self.read_choice("Enter choice: ")? {
                1 => self.add_book().await?,
                2 => self.remove_book().await?,
                3 => self.view_all_books().await,
                0 => return Ok(()),
                _ => println!("Invalid choice."),
            }
        }
    }

    async fn add_book(&self) -> anyhow::Result<()> {
        println!();
        println!("--- Add New Book ---");
        let title = self.read_line("Enter title: ")?;
        let author = self.read_line("Enter author: ")?;
        let isbn = self.read_line("Enter ISBN: ")?;
        let genre = self.read_line("Enter genre: ")?;

        if title.is_empty() || author.is_empty() || isbn.is_empty() {
            println!("Title, author and ISBN are required!");
            return Ok(());
        }

        self.registry
            .add_book(BookDetails {
                title,
                author,
                isbn,
                genre,
            })
            .await;
        println!("Book added successfully!");
        Ok(())
    }

    async fn remove_book(&self) -> anyhow::Result<()> {
        println!();
        println!("--- Remove Book ---");
        let isbn = self.read_line("Enter ISBN to remove: ")?;

        if self.registry.remove_book(&isbn).await {
            println!("Book removed successfully!");
        } else {
            println!("Book not found or could not be removed.");
        }
        Ok(())
    }

    async fn view_all_books(&self) {
        println!();
        println!("--- All Books ---");
        let books = self.registry.list_books().await;

        if books.is_empty() {
            println!("No books available.");
            return;
        }

        for (index, book) in books.iter().enumerate() {
            println!("{}. {}", index + 1, format_book(book));
        }
    }

    async fn handle_user_management(&self) -> anyhow::Result<()> {
        loop {
            println!();
            println!("=== User Management ===");
            println!("1. Register User");
            println!("2. View All Users");
            println!("3. View User Details");
            println!("0. Back to Main Menu");

            match self.read_choice("Enter choice: ")? {
                1 => self.register_user().await?,
                2 => self.view_all_users().await,
                3 => self.view_user_details().await?,
                0 => return Ok(()),
                _ => println!("Invalid choice."),
            }
        }
    }

    async fn register_user(&self) -> anyhow::Result<()> {
        println!();
        println!("--- Register New User ---");
        let name = self.read_line("Enter name: ")?;
        let user_id = self.read_line("Enter user ID: ")?;
        let email = self.read_line("Enter email: ")?;

        let type_input = self.read_line("Enter user type (student/faculty/guest): ")?;
        // The registry only accepts a valid type; anything unrecognized is
        // defaulted here at the driver boundary.
        let user_type = type_input.parse::<UserType>().unwrap_or_else(|err| {
            println!("{err}. Defaulting to Student.");
            UserType::Student
        });

        if name.is_empty() || user_id.is_empty() {
            println!("Name and user ID are required!");
            return Ok(());
        }

        self.registry
            .register_user(MemberDetails {
                name,
                user_id,
                email,
                user_type,
            })
            .await;
        println!("User registered successfully!");
        Ok(())
    }

    async fn view_all_users(&self) {
        println!();
        println!("--- All Users ---");
        let members = self.registry.list_users().await;

        if members.is_empty() {
            println!("No users registered.");
            return;
        }

        for (index, member) in members.iter().enumerate() {
            println!(
                "{}. {} (ID: {}, Type: {}, Books held: {})",
                index + 1,
                member.name,
                member.user_id,
                member.user_type,
                member.held_books.len()
            );
        }
    }

    async fn view_user_details(&self) -> anyhow::Result<()> {
        println!();
        println!("--- User Details ---");
        let user_id = self.read_line("Enter user ID: ")?;

        let Some(member) = self.registry.find_user(&user_id).await else {
            println!("User not found!");
            return Ok(());
        };

        println!("Name: {}", member.name);
        println!("User ID: {}", member.user_id);
        println!("Email: {}", member.email);
        println!("Type: {}", member.user_type);
        println!("Max books allowed: {}", member.policy.max_books);
        println!("Borrow days: {}", member.policy.loan_days);
        println!("Fine per day: ${:.2}", member.policy.fine_per_day);

        println!();
        println!("Borrowed books:");
        if member.held_books.is_empty() {
            println!("No books borrowed.");
            return Ok(());
        }
        for isbn in &member.held_books {
            match self.registry.find_book(isbn).await {
                Some(book) => println!("- {} by {} (ISBN: {})", book.title, book.author, book.isbn),
                None => println!("- (ISBN: {isbn})"),
            }
        }
        Ok(())
    }

    async fn handle_borrowing_operations(&self) -> anyhow::Result<()> {
        loop {
            println!();
            println!("=== Borrowing Operations ===");
            println!("1. Borrow Book");
            println!("2. Return Book");
            println!("0. Back to Main Menu");

            match self.read_choice("Enter choice: ")? {
                1 => self.borrow_book().await?,
                2 => self.return_book().await?,
                0 => return Ok(()),
                _ => println!("Invalid choice."),
            }
        }
    }

    async fn borrow_book(&self) -> anyhow::Result<()> {
        println!();
        println!("--- Borrow Book ---");
        let user_id = self.read_line("Enter user ID: ")?;
        let isbn = self.read_line("Enter book ISBN: ")?;

        if self.registry.borrow_book(&user_id, &isbn).await {
            println!("Book borrowed successfully!");
        } else {
            // The boolean result does not say which check failed
            println!("Failed to borrow book. Possible reasons:");
            println!("- User or book not found");
            println!("- Book already borrowed");
            println!("- User has reached maximum borrowing limit");
        }
        Ok(())
    }

    async fn return_book(&self) -> anyhow::Result<()> {
        println!();
        println!("--- Return Book ---");
        let user_id = self.read_line("Enter user ID: ")?;
        let isbn = self.read_line("Enter book ISBN: ")?;

        if self.registry.return_book(&user_id, &isbn).await {
            println!("Book returned successfully!");
        } else {
            println!("Failed to return book. Possible reasons:");
            println!("- User or book not found");
            println!("- Book was not borrowed by this user");
            println!("- Book is already available");
        }
        Ok(())
    }

    async fn show_overdue_books(&self) {
        println!();
        println!("--- Overdue Books ---");
        let overdue = self.registry.get_overdue_books().await;

        if overdue.is_empty() {
            println!("No overdue books.");
            return;
        }

        for record in overdue {
            match self.registry.find_book(&record.isbn).await {
                Some(book) => println!("Book: {} by {}", book.title, book.author),
                None => println!("Book: (ISBN: {})", record.isbn),
            }
            match self.registry.find_user(&record.user_id).await {
                Some(member) => println!("Borrowed by: {} ({})", member.name, member.user_id),
                None => println!("Borrowed by: ({})", record.user_id),
            }
            println!("Borrow date: {}", record.borrow_date);
            println!("Due date: {}", record.due_date);
            println!("---");
        }
    }

    async fn search_books(&self) -> anyhow::Result<()> {
        println!();
        println!("--- Search Books ---");
        let query = self.read_line("Enter search query (title, author, or genre): ")?;

        let results = self.registry.search_books(&query).await;

        if results.is_empty() {
            println!("No books found matching your search.");
            return Ok(());
        }

        println!("Found {} book(s):", results.len());
        for book in &results {
            println!("- {}", format_book(book));
        }
        Ok(())
    }

    fn read_line(&self, prompt: &str) -> anyhow::Result<String> {
        print!("{prompt}");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let bytes_read = io::stdin()
            .read_line(&mut line)
            .context("Failed to read input")?;
        if bytes_read == 0 {
            anyhow::bail!("Input stream closed");
        }
        Ok(line.trim().to_string())
    }

    fn read_choice(&self, prompt: &str) -> anyhow::Result<u32> {
        loop {
            match self.read_line(prompt)?.parse() {
                Ok(choice) => return Ok(choice),
                Err(_) => println!("Please enter a valid number."),
            }
        }
    }
}

fn format_book(book: &Book) -> String {
    format!(
        "{} by {} (ISBN: {}, Genre: {}) - {}",
        book.title,
        book.author,
        book.isbn,
        book.genre,
        if book.available {
            "Available"
        } else {
            "Borrowed"
        }
    )
}
