//! Concurrent loan attempts
//! Racing callers must serialize on the book row: one winner per book.

use std::path::PathBuf;
use std::time::Duration;

use biblio_loans::config::Config;
use biblio_loans::db;
use biblio_loans::domain::{Loan, LoanDraft, LoanError};
use biblio_loans::models::{book, user};
use biblio_loans::services::loan_service;
use chrono::NaiveDate;
use futures::future::join_all;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

// File-backed database so the pool really hands out several connections
struct TempDb {
    path: PathBuf,
    db: DatabaseConnection,
}

impl TempDb {
    async fn new(max_connections: u32) -> Self {
        let path = std::env::temp_dir().join(format!("biblio-loans-{}.db", uuid::Uuid::new_v4()));
        let config = Config {
            database_url: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections,
            acquire_timeout: Duration::from_secs(30),
            sql_logging: false,
            seed_demo: false,
            profile: "test".to_string(),
        };
        let db = db::connect(&config).await.expect("Failed to init DB");
        Self { path, db }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

async fn create_test_borrower(db: &DatabaseConnection, name: &str) -> i32 {
    let borrower = user::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    };
    user::Entity::insert(borrower)
        .exec(db)
        .await
        .expect("Failed to create borrower")
        .last_insert_id
}

async fn create_test_book(db: &DatabaseConnection, title: &str) -> i32 {
    let shelved = book::ActiveModel {
        title: Set(title.to_string()),
        available: Set(true),
        ..Default::default()
    };
    book::Entity::insert(shelved)
        .exec(db)
        .await
        .expect("Failed to create book")
        .last_insert_id
}

fn draft(book_id: i32, borrower_id: i32) -> LoanDraft {
    LoanDraft {
        book_id,
        borrower_id,
        loan_date: NaiveDate::from_ymd_opt(2024, 9, 1).expect("valid date"),
        due_date: NaiveDate::from_ymd_opt(2024, 9, 15).expect("valid date"),
    }
}

fn assert_single_winner(results: &[Result<Loan, LoanError>], book_id: i32) {
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "results: {:?}", results);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(result, Err(LoanError::BookUnavailable(id)) if *id == book_id),
            "loser should see BookUnavailable, got {:?}",
            result
        );
    }
}

#[tokio::test]
async fn test_racing_creates_on_shared_connection() {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let book_id = create_test_book(&db, "Dune").await;
    let mut borrowers = Vec::new();
    for i in 0..5 {
        borrowers.push(create_test_borrower(&db, &format!("Borrower {}", i)).await);
    }

    let results = join_all(
        borrowers
            .iter()
            .map(|&b| loan_service::create_loan(&db, draft(book_id, b))),
    )
    .await;

    assert_single_winner(&results, book_id);
    assert_eq!(loan_service::count_loans(&db).await.expect("count"), 1);
    assert!(loan_service::audit_availability(&db).await.expect("audit").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_creates_across_connections() {
    let temp = TempDb::new(4).await;
    let book_id = create_test_book(&temp.db, "Foundation").await;
    let mut borrowers = Vec::new();
    for i in 0..8 {
        borrowers.push(create_test_borrower(&temp.db, &format!("Borrower {}", i)).await);
    }

    let handles: Vec<_> = borrowers
        .into_iter()
        .map(|b| {
            let db = temp.db.clone();
            tokio::spawn(async move { loan_service::create_loan(&db, draft(book_id, b)).await })
        })
        .collect();
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_single_winner(&results, book_id);
    assert_eq!(loan_service::count_loans(&temp.db).await.expect("count"), 1);
    assert!(loan_service::audit_availability(&temp.db).await.expect("audit").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_swaps_onto_the_same_book() {
    let temp = TempDb::new(4).await;
    let ana = create_test_borrower(&temp.db, "Ana").await;
    let bruno = create_test_borrower(&temp.db, "Bruno").await;
    let first_book = create_test_book(&temp.db, "First").await;
    let second_book = create_test_book(&temp.db, "Second").await;
    let target = create_test_book(&temp.db, "Target").await;

    let first = loan_service::create_loan(&temp.db, draft(first_book, ana))
        .await
        .expect("create should succeed");
    let second = loan_service::create_loan(&temp.db, draft(second_book, bruno))
        .await
        .expect("create should succeed");

    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|existing| {
            let db = temp.db.clone();
            tokio::spawn(async move {
                loan_service::update_loan(
                    &db,
                    Loan {
                        book_id: target,
                        ..existing
                    },
                )
                .await
            })
        })
        .collect();
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_single_winner(&results, target);
    let on_target = loan_service::list_loans(&temp.db)
        .await
        .expect("list")
        .into_iter()
        .filter(|l| l.book_id == target)
        .count();
    assert_eq!(on_target, 1);
    assert!(loan_service::audit_availability(&temp.db).await.expect("audit").is_empty());
}
