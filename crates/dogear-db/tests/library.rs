//! Integration tests for the storage layer against an in-memory database.

use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use dogear_db::Database;
use dogear_db::models::{
    CanonicalSource, Conversion, NewIntakeItem, NewOwnedItem, NewSource, NewUser,
    RegistrationOutcome,
};

const TIKTOK: CanonicalSource<'static> = CanonicalSource {
    source_type: "tiktok",
    default_name: "TikTok",
};

fn user(db: &Database, email: &str) -> String {
    db.insert_user_if_absent(&NewUser {
        email,
        display_name: "Reader",
        password_hash: "hash",
        is_admin: false,
    })
    .unwrap();
    db.get_user_by_email(email).unwrap().unwrap().id
}

fn capture(db: &Database, user_id: &str, text: &str) -> String {
    db.create_intake_item(
        &NewIntakeItem {
            user_id,
            raw_text: text,
            source_id: None,
            source_post_url: None,
        },
        None,
    )
    .unwrap()
    .unwrap()
    .id
}

fn conversion(title: &str) -> Conversion {
    Conversion {
        owned: NewOwnedItem {
            title: title.to_string(),
            author: None,
            format: "hardcover".to_string(),
            is_favorite: false,
            acquired_at: None,
            notes: Some("Imported from Inbox".to_string()),
        },
        parse_json: "{}".to_string(),
    }
}

fn source_count(db: &Database, user_id: &str, source_type: &str) -> i64 {
    db.with_conn(|conn| {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM sources WHERE user_id = ?1 AND type = ?2",
            [user_id, source_type],
            |r| r.get(0),
        )?)
    })
    .unwrap()
}

#[test]
fn bootstrap_insert_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let admin = NewUser {
        email: "admin@example.com",
        display_name: "Admin",
        password_hash: "hash",
        is_admin: true,
    };
    assert!(db.insert_user_if_absent(&admin).unwrap());
    assert!(!db.insert_user_if_absent(&admin).unwrap());

    let row = db.get_user_by_email("admin@example.com").unwrap().unwrap();
    assert!(row.is_admin);
    assert!(row.is_active);
}

#[test]
fn registration_consumes_invite_once() {
    let db = Database::open_in_memory().unwrap();
    let admin = user(&db, "admin@example.com");
    db.insert_invite("a@example.com", "tok-1", Utc::now() + Duration::hours(1), &admin)
        .unwrap();

    let new_user = NewUser {
        email: "a@example.com",
        display_name: "A",
        password_hash: "hash",
        is_admin: false,
    };
    let outcome = db.register_user(&new_user, Some("tok-1")).unwrap();
    assert!(matches!(outcome, RegistrationOutcome::Created { .. }));
    assert!(db.get_invite_by_token("tok-1").unwrap().unwrap().used_at.is_some());

    let again = NewUser {
        email: "b@example.com",
        ..new_user
    };
    assert_eq!(
        db.register_user(&again, Some("tok-1")).unwrap(),
        RegistrationOutcome::InviteInvalid
    );
    assert!(db.get_user_by_email("b@example.com").unwrap().is_none());
}

#[test]
fn expired_or_unknown_invite_creates_nothing() {
    let db = Database::open_in_memory().unwrap();
    let admin = user(&db, "admin@example.com");
    db.insert_invite("late@example.com", "old", Utc::now() - Duration::minutes(5), &admin)
        .unwrap();

    let new_user = NewUser {
        email: "late@example.com",
        display_name: "Late",
        password_hash: "hash",
        is_admin: false,
    };
    assert_eq!(
        db.register_user(&new_user, Some("old")).unwrap(),
        RegistrationOutcome::InviteExpired
    );
    assert_eq!(
        db.register_user(&new_user, Some("nope")).unwrap(),
        RegistrationOutcome::InviteInvalid
    );
    assert!(db.get_user_by_email("late@example.com").unwrap().is_none());
    assert!(db.get_invite_by_token("old").unwrap().unwrap().used_at.is_none());
}

#[test]
fn duplicate_email_leaves_invite_unused() {
    let db = Database::open_in_memory().unwrap();
    let admin = user(&db, "admin@example.com");
    user(&db, "taken@example.com");
    db.insert_invite("taken@example.com", "tok", Utc::now() + Duration::hours(1), &admin)
        .unwrap();

    let outcome = db
        .register_user(
            &NewUser {
                email: "taken@example.com",
                display_name: "Dup",
                password_hash: "hash",
                is_admin: false,
            },
            Some("tok"),
        )
        .unwrap();
    assert_eq!(outcome, RegistrationOutcome::EmailTaken);
    assert!(db.get_invite_by_token("tok").unwrap().unwrap().used_at.is_none());
}

#[test]
fn open_registration_skips_invite() {
    let db = Database::open_in_memory().unwrap();
    let outcome = db
        .register_user(
            &NewUser {
                email: "open@example.com",
                display_name: "Open",
                password_hash: "hash",
                is_admin: false,
            },
            None,
        )
        .unwrap();
    assert!(matches!(outcome, RegistrationOutcome::Created { .. }));
}

#[test]
fn canonical_source_converges_on_one_row() {
    let db = Database::open_in_memory().unwrap();
    let uid = user(&db, "r@example.com");

    let first = db.find_or_create_canonical_source(&uid, "tiktok", "TikTok").unwrap();
    let second = db.find_or_create_canonical_source(&uid, "tiktok", "TikTok").unwrap();
    assert_eq!(first, second);

    // The insert path alone must also resolve to the existing winner.
    let raced = db.insert_canonical_source(&uid, "tiktok", "TikTok").unwrap();
    assert_eq!(raced, first);
    assert_eq!(source_count(&db, &uid, "tiktok"), 1);
}

#[test]
fn canonical_source_from_many_threads() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let uid = user(&db, "r@example.com");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            let uid = uid.clone();
            thread::spawn(move || db.insert_canonical_source(&uid, "tiktok", "TikTok").unwrap())
        })
        .collect();
    let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(source_count(&db, &uid, "tiktok"), 1);
}

#[test]
fn canonical_sources_are_per_user() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "a@example.com");
    let b = user(&db, "b@example.com");

    let sa = db.find_or_create_canonical_source(&a, "tiktok", "TikTok").unwrap();
    let sb = db.find_or_create_canonical_source(&b, "tiktok", "TikTok").unwrap();
    assert_ne!(sa, sb);
}

#[test]
fn manual_sources_are_not_deduplicated() {
    let db = Database::open_in_memory().unwrap();
    let uid = user(&db, "r@example.com");
    for name in ["Erin", "Mum"] {
        db.create_source(&NewSource {
            user_id: &uid,
            source_type: "friend",
            name,
            url: None,
            notes: None,
        })
        .unwrap();
    }

    let listed = db.list_sources(&uid).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].name, "Mum");
    assert!(listed.iter().all(|s| !s.is_canonical));
}

#[test]
fn capture_with_auto_source_joins_source_metadata() {
    let db = Database::open_in_memory().unwrap();
    let uid = user(&db, "r@example.com");

    let make = |url: &'static str| {
        db.create_intake_item(
            &NewIntakeItem {
                user_id: &uid,
                raw_text: "Dune by Frank Herbert",
                source_id: None,
                source_post_url: Some(url),
            },
            Some(TIKTOK),
        )
        .unwrap()
        .unwrap()
    };
    let one = make("https://www.tiktok.com/@x/video/1");
    let two = make("https://www.tiktok.com/@y/video/2");

    assert_eq!(one.status, "new");
    assert_eq!(one.source_name.as_deref(), Some("TikTok"));
    assert_eq!(one.source_type.as_deref(), Some("tiktok"));
    assert_eq!(one.source_id, two.source_id);
    assert_eq!(source_count(&db, &uid, "tiktok"), 1);
}

#[test]
fn capture_rejects_foreign_explicit_source() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "a@example.com");
    let b = user(&db, "b@example.com");
    let foreign = db
        .create_source(&NewSource {
            user_id: &b,
            source_type: "friend",
            name: "B's friend",
            url: None,
            notes: None,
        })
        .unwrap();

    let result = db
        .create_intake_item(
            &NewIntakeItem {
                user_id: &a,
                raw_text: "Something",
                source_id: Some(&foreign.id),
                source_post_url: None,
            },
            None,
        )
        .unwrap();
    assert!(result.is_none());
    assert!(db.list_intake_items(&a, None).unwrap().is_empty());
}

#[test]
fn intake_listing_filters_and_orders() {
    let db = Database::open_in_memory().unwrap();
    let uid = user(&db, "r@example.com");
    let other = user(&db, "o@example.com");

    let first = capture(&db, &uid, "first");
    let second = capture(&db, &uid, "second");
    let third = capture(&db, &uid, "third");
    capture(&db, &other, "not mine");

    db.convert_intake_to_owned(&uid, &second, |_| conversion("second"))
        .unwrap()
        .unwrap();

    let all: Vec<String> = db.list_intake_items(&uid, None).unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(all, vec![third.clone(), second.clone(), first.clone()]);

    let fresh: Vec<String> = db
        .list_intake_items(&uid, Some("new"))
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(fresh, vec![third, first]);

    let owned = db.list_intake_items(&uid, Some("owned")).unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, second);
}

#[test]
fn naive_legacy_timestamps_are_readable() {
    let db = Database::open_in_memory().unwrap();
    let uid = user(&db, "r@example.com");
    let id = capture(&db, &uid, "legacy");
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE intake_items SET captured_at = '2023-01-01 08:00:00', status = 'needs_review' WHERE id = ?1",
            [&id],
        )?;
        Ok(())
    })
    .unwrap();

    let row = db.get_intake_item(&uid, &id).unwrap().unwrap();
    assert_eq!(row.status, "needs_review");
    let parsed = dogear_types::time::parse_utc(&row.captured_at).unwrap();
    assert_eq!(parsed.to_rfc3339(), "2023-01-01T08:00:00+00:00");
}

#[test]
fn conversion_is_owner_scoped() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "a@example.com");
    let b = user(&db, "b@example.com");
    let item = capture(&db, &a, "Dune");

    let stolen = db.convert_intake_to_owned(&b, &item, |_| conversion("Dune")).unwrap();
    assert!(stolen.is_none());
    assert_eq!(db.get_intake_item(&a, &item).unwrap().unwrap().status, "new");
    assert!(db.list_owned_items(&b, None, None).unwrap().is_empty());
}

#[test]
fn failed_conversion_leaves_no_partial_state() {
    let db = Database::open_in_memory().unwrap();
    let uid = user(&db, "r@example.com");
    let item = capture(&db, &uid, "Dune by Frank Herbert");

    // Simulate a crash between the owned insert and the intake update.
    db.with_conn(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER fail_status BEFORE UPDATE ON intake_items
             BEGIN SELECT RAISE(ABORT, 'simulated crash'); END;",
        )?;
        Ok(())
    })
    .unwrap();

    let result = db.convert_intake_to_owned(&uid, &item, |_| conversion("Dune"));
    assert!(result.is_err());
    assert!(db.list_owned_items(&uid, None, None).unwrap().is_empty());
    assert_eq!(db.get_intake_item(&uid, &item).unwrap().unwrap().status, "new");

    db.with_conn(|conn| {
        conn.execute_batch("DROP TRIGGER fail_status;")?;
        Ok(())
    })
    .unwrap();

    let owned = db
        .convert_intake_to_owned(&uid, &item, |_| conversion("Dune"))
        .unwrap()
        .unwrap();
    assert_eq!(db.get_owned_item(&uid, &owned.id).unwrap().unwrap().title, "Dune");
    assert_eq!(db.get_intake_item(&uid, &item).unwrap().unwrap().status, "owned");
    assert_eq!(db.list_owned_items(&uid, None, None).unwrap().len(), 1);
}

#[test]
fn owned_listing_filters_and_delete_is_scoped() {
    let db = Database::open_in_memory().unwrap();
    let uid = user(&db, "r@example.com");
    let other = user(&db, "o@example.com");

    let make = |title: &str, format: &str, fav: bool| NewOwnedItem {
        title: title.to_string(),
        author: None,
        format: format.to_string(),
        is_favorite: fav,
        acquired_at: None,
        notes: None,
    };
    let a = db.create_owned_item(&uid, &make("A", "ebook", true)).unwrap();
    let b = db.create_owned_item(&uid, &make("B", "ebook", false)).unwrap();
    db.create_owned_item(&uid, &make("C", "paperback", true)).unwrap();

    let ebooks = db.list_owned_items(&uid, Some("ebook"), None).unwrap();
    assert_eq!(ebooks.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(), vec!["B", "A"]);

    let fav_ebooks = db.list_owned_items(&uid, Some("ebook"), Some(true)).unwrap();
    assert_eq!(fav_ebooks.len(), 1);
    assert_eq!(fav_ebooks[0].id, a.id);

    let favs = db.list_owned_items(&uid, None, Some(true)).unwrap();
    assert_eq!(favs.len(), 2);

    assert!(!db.delete_owned_item(&other, &b.id).unwrap());
    assert!(db.delete_owned_item(&uid, &b.id).unwrap());
    assert!(!db.delete_owned_item(&uid, &b.id).unwrap());
    assert_eq!(db.list_owned_items(&uid, None, None).unwrap().len(), 2);
}
