//! Loan Service - transactional loan workflow
//!
//! Keeps `books.available` in step with the loans table: a book is
//! unavailable exactly while one loan references it. Every mutation locks the
//! affected book row inside its own transaction before reading or flipping the
//! flag, so concurrent callers racing for the same book serialize on that lock
//! and the loser sees the winner's committed flag.

use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::collections::HashMap;

use crate::domain::{AvailabilityMismatch, Loan, LoanDraft, LoanError};
use crate::models::book::{self, Entity as Book};
use crate::models::loan::{self, Entity as LoanEntity};

/// Create a loan, taking the book off the shelf in the same transaction
#[tracing::instrument(skip_all, fields(book_id = draft.book_id, borrower_id = draft.borrower_id))]
pub async fn create_loan(db: &DatabaseConnection, draft: LoanDraft) -> Result<Loan, LoanError> {
    let txn = db.begin().await?;
    let outcome = insert_loan(&txn, &draft).await;
    let created = settle(txn, outcome).await?;

    tracing::info!(loan_id = created.id, "loan created");
    Ok(created)
}

/// List all loans, most recent first
pub async fn list_loans(db: &DatabaseConnection) -> Result<Vec<Loan>, LoanError> {
    let rows = LoanEntity::find()
        .order_by_desc(loan::Column::Id)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(Loan::from).collect())
}

/// Fetch one loan. Absence is `Ok(None)`.
pub async fn get_loan<C>(db: &C, id: i32) -> Result<Option<Loan>, LoanError>
where
    C: ConnectionTrait,
{
    let row = LoanEntity::find_by_id(id).one(db).await?;
    Ok(row.map(Loan::from))
}

/// Rewrite every field of an existing loan.
///
/// When `book_id` changes the new book is locked and checked first, then the
/// old book is released and the new one blocked, all in one transaction.
#[tracing::instrument(skip_all, fields(loan_id = loan.id, book_id = loan.book_id))]
pub async fn update_loan(db: &DatabaseConnection, loan: Loan) -> Result<Loan, LoanError> {
    let previous = get_loan(db, loan.id)
        .await?
        .ok_or(LoanError::LoanNotFound(loan.id))?;

    let txn = db.begin().await?;
    let outcome = rewrite_loan(&txn, &previous, &loan).await;
    let updated = settle(txn, outcome).await?;

    if previous.book_id != updated.book_id {
        tracing::info!(
            from_book = previous.book_id,
            to_book = updated.book_id,
            "loan moved to another book"
        );
    } else {
        tracing::info!("loan updated");
    }
    Ok(updated)
}

/// Delete a loan and put its book back on the shelf. Unknown ids are a no-op.
///
/// Fails with `LoanError::Conflict` when a concurrent update moved the loan to
/// another book after it was read, otherwise only with `LoanError::Storage`.
#[tracing::instrument(skip(db))]
pub async fn delete_loan(db: &DatabaseConnection, id: i32) -> Result<(), LoanError> {
    let Some(existing) = get_loan(db, id).await? else {
        tracing::debug!("no such loan, nothing to delete");
        return Ok(());
    };

    let txn = db.begin().await?;
    let outcome = remove_loan(&txn, &existing).await;
    let removed = settle(txn, outcome).await?;

    if removed {
        tracing::info!(book_id = existing.book_id, "loan deleted, book released");
    }
    Ok(())
}

/// Count loans (every loan row holds one book)
pub async fn count_loans(db: &DatabaseConnection) -> Result<u64, LoanError> {
    let count = LoanEntity::find().count(db).await?;
    Ok(count)
}

/// Report every book whose availability flag disagrees with its loans.
///
/// A book must be available with no loans, unavailable with exactly one;
/// anything else is listed.
pub async fn audit_availability(
    db: &DatabaseConnection,
) -> Result<Vec<AvailabilityMismatch>, LoanError> {
    let books = Book::find().order_by_asc(book::Column::Id).all(db).await?;

    let mut loan_counts: HashMap<i32, u64> = HashMap::new();
    for row in LoanEntity::find().all(db).await? {
        *loan_counts.entry(row.book_id).or_insert(0) += 1;
    }

    let mismatches = books
        .into_iter()
        .filter_map(|b| {
            let loan_count = loan_counts.get(&b.id).copied().unwrap_or(0);
            let consistent = match loan_count {
                0 => b.available,
                1 => !b.available,
                _ => false,
            };
            (!consistent).then_some(AvailabilityMismatch {
                book_id: b.id,
                available: b.available,
                loan_count,
            })
        })
        .collect();

    Ok(mismatches)
}

async fn insert_loan(txn: &DatabaseTransaction, draft: &LoanDraft) -> Result<Loan, LoanError> {
    claim_book(txn, draft.book_id).await?;

    let row = loan::ActiveModel {
        book_id: Set(draft.book_id),
        borrower_id: Set(draft.borrower_id),
        loan_date: Set(draft.loan_date),
        due_date: Set(draft.due_date),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    set_book_available(txn, draft.book_id, false).await?;

    Ok(row.into())
}

/// `previous` is the persisted state read before the transaction opened.
async fn rewrite_loan(
    txn: &DatabaseTransaction,
    previous: &Loan,
    next: &Loan,
) -> Result<Loan, LoanError> {
    let book_changed = previous.book_id != next.book_id;

    if book_changed {
        claim_book(txn, next.book_id).await?;
    }

    // Guarded on the old book so a concurrent swap cannot be overwritten blindly
    let result = LoanEntity::update_many()
        .set(loan::ActiveModel {
            book_id: Set(next.book_id),
            borrower_id: Set(next.borrower_id),
            loan_date: Set(next.loan_date),
            due_date: Set(next.due_date),
            ..Default::default()
        })
        .filter(loan::Column::Id.eq(next.id))
        .filter(loan::Column::BookId.eq(previous.book_id))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(match get_loan(txn, next.id).await? {
            Some(_) => LoanError::Conflict(next.id),
            None => LoanError::LoanNotFound(next.id),
        });
    }

    if book_changed {
        set_book_available(txn, previous.book_id, true).await?;
        set_book_available(txn, next.book_id, false).await?;
    }

    Ok(next.clone())
}

/// Returns `false` when the loan was already gone.
async fn remove_loan(txn: &DatabaseTransaction, existing: &Loan) -> Result<bool, LoanError> {
    let result = LoanEntity::delete_many()
        .filter(loan::Column::Id.eq(existing.id))
        .filter(loan::Column::BookId.eq(existing.book_id))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        return match get_loan(txn, existing.id).await? {
            Some(_) => Err(LoanError::Conflict(existing.id)),
            None => Ok(false),
        };
    }

    // No existence check: a book removed out-of-band makes this a no-op
    set_book_available(txn, existing.book_id, true).await?;

    Ok(true)
}

/// Lock the book row and fail unless it is on the shelf.
async fn claim_book(txn: &DatabaseTransaction, book_id: i32) -> Result<(), LoanError> {
    if !lock_book_availability(txn, book_id).await? {
        tracing::warn!(book_id, "book is already on loan");
        return Err(LoanError::BookUnavailable(book_id));
    }
    Ok(())
}

/// Locking read of a book's availability flag.
///
/// The self-assignment takes the row lock first. SQLite ignores `FOR UPDATE`,
/// so there it is the write that takes the database write lock and makes
/// concurrent lockers wait. The select then reads the flag under that lock.
/// Both locks are held until the transaction ends.
async fn lock_book_availability(
    txn: &DatabaseTransaction,
    book_id: i32,
) -> Result<bool, LoanError> {
    Book::update_many()
        .col_expr(
            book::Column::Available,
            Expr::col(book::Column::Available).into(),
        )
        .filter(book::Column::Id.eq(book_id))
        .exec(txn)
        .await?;

    let available = Book::find_by_id(book_id)
        .select_only()
        .column(book::Column::Available)
        .lock_exclusive()
        .into_tuple::<bool>()
        .one(txn)
        .await?
        .ok_or(LoanError::BookNotFound(book_id))?;

    tracing::debug!(book_id, available, "book row locked");
    Ok(available)
}

async fn set_book_available(
    txn: &DatabaseTransaction,
    book_id: i32,
    available: bool,
) -> Result<(), LoanError> {
    Book::update_many()
        .col_expr(book::Column::Available, Expr::value(available))
        .filter(book::Column::Id.eq(book_id))
        .exec(txn)
        .await?;
    Ok(())
}

/// Commit on success, roll back on any error.
///
/// A failed rollback is logged and the original error returned; the
/// connection discards the transaction when it goes back to the pool.
async fn settle<T>(
    txn: DatabaseTransaction,
    outcome: Result<T, LoanError>,
) -> Result<T, LoanError> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, cause = %err, "rollback failed");
            }
            Err(err)
        }
    }
}
