//! Data models for Biblioteca

pub mod book;
pub mod category;
pub mod form;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use book::{Book, BookForm, BookQuery, BookWithCategory};
pub use category::{Category, CategoryForm, CategoryWithBookCount};
pub use form::FormErrors;
pub use loan::{Loan, LoanDetails, LoanForm, LoanQuery, LoanStatus};
pub use member::{Member, MemberForm, MemberWithActiveLoans};
