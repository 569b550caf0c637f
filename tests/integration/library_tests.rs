//! Database-backed tests. Each test gets a fresh migrated database.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tower::ServiceExt;

use biblioteca_server::{
    api,
    models::{
        form::INVALID_CHOICE, BookForm, BookQuery, CategoryForm, LoanForm, LoanQuery, LoanStatus,
        MemberForm,
    },
    repository::Repository,
    services::Services,
    AppConfig, AppError, AppState,
};

fn services(pool: &PgPool) -> Services {
    Services::new(Repository::new(pool.clone()))
}

async fn category(services: &Services, name: &str) -> i32 {
    services
        .catalog
        .create_category(&CategoryForm {
            name: Some(name.into()),
            description: String::new(),
        })
        .await
        .unwrap()
        .id
}

async fn book(services: &Services, category_id: i32, isbn: &str, copies: i32) -> i32 {
    services
        .catalog
        .create_book(&BookForm {
            title: Some(format!("Book {}", isbn)),
            author: Some("Jorge Luis Borges".into()),
            isbn: Some(isbn.into()),
            category: Some(category_id.to_string()),
            publication_date: Some("1944-01-01".into()),
            total_copies: Some(copies.to_string()),
            available_copies: Some(copies.to_string()),
            description: String::new(),
        })
        .await
        .unwrap()
        .id
}

async fn member(services: &Services, email: &str) -> i32 {
    services
        .members
        .create_member(&MemberForm {
            first_name: Some("Ana".into()),
            last_name: Some("Pérez".into()),
            email: Some(email.into()),
            ..MemberForm::default()
        })
        .await
        .unwrap()
        .id
}

fn loan_form(member_id: i32, book_id: i32, due_in_days: i64) -> LoanForm {
    let due = Utc::now().date_naive() + Duration::days(due_in_days);
    LoanForm {
        member: Some(member_id.to_string()),
        book: Some(book_id.to_string()),
        due_date: Some(due.format("%Y-%m-%d").to_string()),
        notes: String::new(),
    }
}

async fn available(services: &Services, book_id: i32) -> i32 {
    services
        .catalog
        .get_book(book_id)
        .await
        .unwrap()
        .available_copies
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_copies_follow_loans_and_returns(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Fiction").await;
    let book_a = book(&s, cat, "9780142437889", 2).await;
    let ana = member(&s, "ana@example.org").await;
    let now = Utc::now();

    let l1 = s.loans.create_loan(&loan_form(ana, book_a, 15), now).await.unwrap();
    assert_eq!(available(&s, book_a).await, 1);

    s.loans.create_loan(&loan_form(ana, book_a, 15), now).await.unwrap();
    assert_eq!(available(&s, book_a).await, 0);

    let choices = s.loans.choices().await.unwrap();
    assert!(choices.books.iter().all(|b| b.id != book_a));

    match s.loans.create_loan(&loan_form(ana, book_a, 15), now).await {
        Err(AppError::Validation(errors)) => assert_eq!(errors.get("book"), [INVALID_CHOICE]),
        other => panic!("expected a validation error, got {:?}", other.map(|l| l.id)),
    }
    assert_eq!(available(&s, book_a).await, 0);

    let returned = s.loans.return_loan(l1.id, Utc::now()).await.unwrap();
    assert_eq!(returned.status, LoanStatus::Returned);
    assert!(returned.returned_at.is_some());
    assert_eq!(available(&s, book_a).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_second_return_changes_nothing(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Poetry").await;
    let b = book(&s, cat, "8437604947", 1).await;
    let m = member(&s, "luis@example.org").await;

    let loan = s.loans.create_loan(&loan_form(m, b, 15), Utc::now()).await.unwrap();
    let first = s.loans.return_loan(loan.id, Utc::now()).await.unwrap();
    assert_eq!(available(&s, b).await, 1);

    let second = s.loans.return_loan(loan.id, Utc::now()).await;
    assert!(matches!(second, Err(AppError::BusinessRule(_))));
    assert_eq!(available(&s, b).await, 1);

    let stored = Repository::new(pool.clone()).loans.get_by_id(loan.id).await.unwrap();
    assert_eq!(stored.returned_at, first.returned_at);

    assert!(matches!(
        s.loans.return_loan(loan.id + 100, Utc::now()).await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_inactive_member_cannot_borrow(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "History").await;
    let b = book(&s, cat, "0140449132", 3).await;
    let m = member(&s, "inactive@example.org").await;

    s.members
        .update_member(
            m,
            &MemberForm {
                first_name: Some("Ana".into()),
                last_name: Some("Pérez".into()),
                email: Some("inactive@example.org".into()),
                ..MemberForm::default()
            },
        )
        .await
        .unwrap();

    match s.loans.create_loan(&loan_form(m, b, 15), Utc::now()).await {
        Err(AppError::Validation(errors)) => assert_eq!(errors.get("member"), [INVALID_CHOICE]),
        other => panic!("expected a validation error, got {:?}", other.map(|l| l.id)),
    }
    assert_eq!(available(&s, b).await, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_guarded_deletes(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Essays").await;
    let empty_cat = category(&s, "Empty").await;
    let b = book(&s, cat, "9788420471839", 1).await;
    let m = member(&s, "reader@example.org").await;
    let loan = s.loans.create_loan(&loan_form(m, b, 15), Utc::now()).await.unwrap();

    assert!(matches!(s.catalog.delete_category(cat).await, Err(AppError::BusinessRule(_))));
    assert!(matches!(s.catalog.delete_book(b).await, Err(AppError::BusinessRule(_))));
    assert!(matches!(s.members.delete_member(m).await, Err(AppError::BusinessRule(_))));

    assert!(s.catalog.get_category(cat).await.is_ok());
    assert!(s.catalog.get_book(b).await.is_ok());
    assert!(s.members.get_member(m).await.is_ok());

    s.catalog.delete_category(empty_cat).await.unwrap();
    assert_eq!(s.catalog.list_categories().await.unwrap().len(), 1);

    let other_book = book(&s, cat, "9780307474728", 1).await;
    let other_member = member(&s, "other@example.org").await;
    let other_loan = s
        .loans
        .create_loan(&loan_form(other_member, other_book, 15), Utc::now())
        .await
        .unwrap();

    s.loans.return_loan(loan.id, Utc::now()).await.unwrap();
    let deleted = s.catalog.delete_book(b).await.unwrap();
    assert_eq!(deleted.id, b);
    assert!(matches!(s.catalog.get_book(b).await, Err(AppError::NotFound(_))));
    assert!(s.catalog.get_book(other_book).await.is_ok());

    let today = Utc::now().date_naive();
    let remaining = s.loans.list_loans(&LoanQuery::default(), today).await.unwrap();
    let ids: Vec<i32> = remaining.iter().map(|l| l.loan.id).collect();
    assert_eq!(ids, vec![other_loan.id]);

    s.members.delete_member(m).await.unwrap();
    assert!(matches!(s.members.get_member(m).await, Err(AppError::NotFound(_))));
    assert!(s.members.get_member(other_member).await.is_ok());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_edit_cannot_shelve_copies_on_loan(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Novels").await;
    let b = book(&s, cat, "9780060883287", 1).await;
    let m = member(&s, "borrower@example.org").await;
    let loan = s.loans.create_loan(&loan_form(m, b, 15), Utc::now()).await.unwrap();

    let mut form = BookForm::from_book(&s.catalog.get_book(b).await.unwrap());
    form.available_copies = Some("1".into());
    match s.catalog.update_book(b, &form).await {
        Err(AppError::Validation(errors)) => assert!(errors.has("available_copies")),
        other => panic!("expected a validation error, got {:?}", other.map(|b| b.id)),
    }
    assert_eq!(available(&s, b).await, 0);

    form.total_copies = Some("2".into());
    form.available_copies = Some("1".into());
    s.catalog.update_book(b, &form).await.unwrap();

    s.loans.return_loan(loan.id, Utc::now()).await.unwrap();
    let stored = s.catalog.get_book(b).await.unwrap();
    assert_eq!(stored.available_copies, 2);
    assert!(stored.available_copies <= stored.total_copies);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_refused_loan_reports_member_and_book(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Theatre").await;
    let b = book(&s, cat, "9780141182551", 1).await;
    let busy = member(&s, "busy@example.org").await;
    let m = member(&s, "gone@example.org").await;
    s.loans.create_loan(&loan_form(busy, b, 15), Utc::now()).await.unwrap();

    s.members
        .update_member(
            m,
            &MemberForm {
                first_name: Some("Ana".into()),
                last_name: Some("Pérez".into()),
                email: Some("gone@example.org".into()),
                ..MemberForm::default()
            },
        )
        .await
        .unwrap();

    match s.loans.create_loan(&loan_form(m, b, 15), Utc::now()).await {
        Err(AppError::Validation(errors)) => {
            assert_eq!(errors.get("member"), [INVALID_CHOICE]);
            assert_eq!(errors.get("book"), [INVALID_CHOICE]);
        }
        other => panic!("expected a validation error, got {:?}", other.map(|l| l.id)),
    }

    match s.loans.create_loan(&loan_form(busy, b + 100, 15), Utc::now()).await {
        Err(AppError::Validation(errors)) => {
            assert!(!errors.has("member"));
            assert_eq!(errors.get("book"), [INVALID_CHOICE]);
        }
        other => panic!("expected a validation error, got {:?}", other.map(|l| l.id)),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_counters_and_overdue_filter(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Science").await;
    let b1 = book(&s, cat, "0553380168", 2).await;
    let b2 = book(&s, cat, "0393609391", 2).await;
    let ana = member(&s, "ana@example.org").await;
    let luis = member(&s, "luis@example.org").await;
    let now = Utc::now();
    let today = now.date_naive();

    let late = s.loans.create_loan(&loan_form(ana, b1, -3), now).await.unwrap();
    let done = s.loans.create_loan(&loan_form(luis, b1, 10), now).await.unwrap();
    s.loans.create_loan(&loan_form(luis, b2, 10), now).await.unwrap();
    s.loans.return_loan(done.id, now).await.unwrap();

    let summary = s.stats.summary(today).await.unwrap();
    assert_eq!(summary.total_books, 2);
    assert_eq!(summary.active_members, 2);
    assert_eq!(summary.active_loans, 2);
    assert_eq!(summary.overdue_loans, 1);

    let counts = Repository::new(pool.clone()).loans.counts(today).await.unwrap();
    assert_eq!((counts.total, counts.active, counts.overdue), (3, 2, 1));

    let report = s.stats.report(today, 10).await.unwrap();
    assert_eq!(report.total_loans, 3);
    assert!(report.overdue_loans <= report.active_loans);
    assert!(report.active_loans <= report.total_loans);

    let overdue = s
        .loans
        .list_loans(&LoanQuery { status: Some(LoanStatus::Overdue) }, today)
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].loan.id, late.id);
    assert!(overdue[0].is_overdue);
    assert_eq!(overdue[0].loan.status, LoanStatus::Loaned);

    let returned = s
        .loans
        .list_loans(&LoanQuery { status: Some(LoanStatus::Returned) }, today)
        .await
        .unwrap();
    assert_eq!(returned.len(), 1);
    assert!(!returned[0].is_overdue);

    let all = s.loans.list_loans(&LoanQuery::default(), today).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_rankings_break_ties_by_id(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Drama").await;
    let first = book(&s, cat, "1111111111", 5).await;
    let second = book(&s, cat, "2222222222", 5).await;
    book(&s, cat, "3333333333", 5).await;
    let m1 = member(&s, "one@example.org").await;
    let m2 = member(&s, "two@example.org").await;
    let now = Utc::now();

    s.loans.create_loan(&loan_form(m2, second, 15), now).await.unwrap();
    s.loans.create_loan(&loan_form(m1, first, 15), now).await.unwrap();

    let report = s.stats.report(now.date_naive(), 10).await.unwrap();
    let books: Vec<i32> = report.most_borrowed_books.iter().map(|b| b.id).collect();
    let members: Vec<i32> = report.most_active_members.iter().map(|m| m.id).collect();
    assert_eq!(books, vec![first, second]);
    assert_eq!(members, vec![m1, m2]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_search_matches_isbn_case_insensitively(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Reference").await;
    let target = book(&s, cat, "080442957X", 1).await;
    book(&s, cat, "0804429570", 1).await;

    let found = s
        .catalog
        .search_books(&BookQuery {
            category: None,
            search: Some("2957x".into()),
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].book.id, target);

    let wildcard = s
        .catalog
        .search_books(&BookQuery {
            category: None,
            search: Some("%".into()),
        })
        .await
        .unwrap();
    assert!(wildcard.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_uniqueness_is_reported_on_the_field(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Travel").await;
    book(&s, cat, "9780140449136", 1).await;
    member(&s, "ana@example.org").await;

    let dup_member = s
        .members
        .create_member(&MemberForm {
            first_name: Some("Ana".into()),
            last_name: Some("Otra".into()),
            email: Some("ANA@example.org".into()),
            ..MemberForm::default()
        })
        .await;
    match dup_member {
        Err(AppError::Validation(errors)) => assert!(errors.has("email")),
        other => panic!("expected a validation error, got {:?}", other.map(|m| m.id)),
    }

    let dup_category = s
        .catalog
        .create_category(&CategoryForm {
            name: Some("Travel".into()),
            description: String::new(),
        })
        .await;
    match dup_category {
        Err(AppError::Validation(errors)) => assert!(errors.has("name")),
        other => panic!("expected a validation error, got {:?}", other.map(|c| c.id)),
    }

    let mut form = BookForm {
        title: Some("Another".into()),
        author: Some("Someone".into()),
        isbn: Some("9780140449136".into()),
        category: Some(cat.to_string()),
        publication_date: Some("2001-05-01".into()),
        ..BookForm::default()
    };
    match s.catalog.create_book(&form).await {
        Err(AppError::Validation(errors)) => assert!(errors.has("isbn")),
        other => panic!("expected a validation error, got {:?}", other.map(|b| b.id)),
    }

    form.isbn = Some("9780140449137".into());
    form.category = Some((cat + 50).to_string());
    match s.catalog.create_book(&form).await {
        Err(AppError::Validation(errors)) => assert_eq!(errors.get("category"), [INVALID_CHOICE]),
        other => panic!("expected a validation error, got {:?}", other.map(|b| b.id)),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_loan_form_round_trip_over_http(pool: PgPool) {
    let s = services(&pool);
    let cat = category(&s, "Classics").await;
    let b = book(&s, cat, "9780451524935", 1).await;
    let m = member(&s, "http@example.org").await;
    let app = api::router(AppState::new(AppConfig::default(), pool.clone()));

    let form = loan_form(m, b, 15);
    let body = format!(
        "member={}&book={}&due_date={}&notes=",
        m,
        b,
        form.due_date.unwrap_or_default()
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/prestamos/agregar/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/prestamos/");
    assert!(response.headers().contains_key(header::SET_COOKIE));
    assert_eq!(available(&s, b).await, 0);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/prestamos/agregar/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(page["books"], serde_json::json!([]));
    assert_eq!(page["members"][0]["id"], m);
}
