//! Integration tests for `SqliteStore` against an in-memory database, plus
//! the ownership-aware operations of `leadbook-core` running on top of it.

use leadbook_core::{
  Error as CoreError,
  buyer::{Bhk, BuyerDraft, City, PropertyType, Purpose, Source, Status, Timeline},
  form::BuyerForm,
  history::{Change, NewHistoryEntry},
  principal::{NewUser, Principal, Role},
  records,
  store::{BuyerFilter, BuyerQuery, LeadStore},
  users::{self, PrincipalClaim},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn draft(name: &str, phone: &str) -> BuyerDraft {
  BuyerDraft {
    full_name:     name.into(),
    email:         None,
    phone:         phone.into(),
    city:          City::Chandigarh,
    property_type: PropertyType::Apartment,
    bhk:           Some(Bhk::Two),
    purpose:       Purpose::Buy,
    budget_min:    Some(5_000_000),
    budget_max:    Some(7_000_000),
    timeline:      Timeline::ZeroToThreeMonths,
    source:        Source::Website,
    status:        Status::New,
    notes:         None,
    tags:          vec!["hot".into()],
  }
}

fn form(name: &str, phone: &str) -> BuyerForm {
  BuyerForm {
    full_name: Some(name.into()),
    phone: Some(phone.into()),
    city: Some("Mohali".into()),
    property_type: Some("Villa".into()),
    bhk: Some("3".into()),
    ..BuyerForm::default()
  }
}

async fn user(s: &SqliteStore, email: &str, role: Role) -> Principal {
  s.add_user(NewUser {
    email: email.into(),
    name: None,
    role,
    password_hash: None,
  })
  .await
  .unwrap()
  .principal()
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_find_user_ignores_email_case() {
  let s = store().await;
  let u = user(&s, "Agent@Example.com", Role::User).await;
  assert_eq!(u.email, "agent@example.com");

  let found = s.find_user_by_email("AGENT@example.COM").await.unwrap();
  assert_eq!(found.map(|f| f.id), Some(u.id));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  user(&s, "a@example.com", Role::User).await;

  let err = s
    .add_user(NewUser {
      email:         "A@example.com".into(),
      name:          None,
      role:          Role::Admin,
      password_hash: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateEmail(_)));
}

#[tokio::test]
async fn set_role_on_missing_user_returns_none() {
  let s = store().await;
  let result = s.set_user_role(Uuid::new_v4(), Role::Admin).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn list_users_oldest_first() {
  let s = store().await;
  let a = user(&s, "a@example.com", Role::User).await;
  let b = user(&s, "b@example.com", Role::Admin).await;

  let ids: Vec<_> = s.list_users().await.unwrap().into_iter().map(|u| u.id).collect();
  assert_eq!(ids, vec![a.id, b.id]);
}

// ─── Buyers ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_buyer_round_trips() {
  let s = store().await;
  let owner = Uuid::new_v4();

  let created = s
    .insert_buyer(draft("Asha Verma", "9876543210"), Some(owner))
    .await
    .unwrap();
  assert_eq!(created.created_at, created.updated_at);

  let fetched = s.get_buyer(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_missing_buyer_returns_none() {
  let s = store().await;
  assert!(s.get_buyer(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_orders_by_most_recent_update() {
  let s = store().await;
  let first = s.insert_buyer(draft("First", "9000000001"), None).await.unwrap();
  let second = s.insert_buyer(draft("Second", "9000000002"), None).await.unwrap();

  s.replace_buyer(first.id, draft("First Again", "9000000001"))
    .await
    .unwrap()
    .unwrap();

  let page = s
    .list_buyers(&BuyerQuery::new(BuyerFilter::default(), None, None))
    .await
    .unwrap();
  let ids: Vec<_> = page.items.iter().map(|b| b.id).collect();
  assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn list_paginates_with_totals() {
  let s = store().await;
  for i in 0..12 {
    s.insert_buyer(draft("Buyer", &format!("90000000{i:02}")), None)
      .await
      .unwrap();
  }

  let query = BuyerQuery::new(BuyerFilter::default(), Some(2), Some(5));
  let page = s.list_buyers(&query).await.unwrap();
  assert_eq!(page.items.len(), 5);
  assert_eq!(page.total, 12);
  assert_eq!(page.total_pages, 3);

  let last = s
    .list_buyers(&BuyerQuery::new(BuyerFilter::default(), Some(3), Some(5)))
    .await
    .unwrap();
  assert_eq!(last.items.len(), 2);
}

#[tokio::test]
async fn list_filters_compose() {
  let s = store().await;
  let owner = Uuid::new_v4();

  let mut d = draft("Ravi Kumar", "9811111111");
  d.city = City::Mohali;
  d.email = Some("ravi@example.com".into());
  let ravi = s.insert_buyer(d, Some(owner)).await.unwrap();

  let mut d = draft("Meena", "9822222222");
  d.city = City::Mohali;
  d.status = Status::Qualified;
  s.insert_buyer(d, Some(owner)).await.unwrap();

  s.insert_buyer(draft("Ravi Other", "9833333333"), None).await.unwrap();

  let filter = BuyerFilter {
    search: Some("RAVI".into()),
    city: Some(City::Mohali),
    ..BuyerFilter::default()
  };
  let page = s.list_buyers(&BuyerQuery::new(filter, None, None)).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].id, ravi.id);

  let by_email = BuyerFilter {
    search: Some("example.com".into()),
    ..BuyerFilter::default()
  };
  assert_eq!(s.export_buyers(&by_email).await.unwrap().len(), 1);

  let by_owner = BuyerFilter {
    owner_id: Some(owner),
    ..BuyerFilter::default()
  };
  assert_eq!(s.export_buyers(&by_owner).await.unwrap().len(), 2);

  let by_status = BuyerFilter {
    status: Some(Status::Qualified),
    ..BuyerFilter::default()
  };
  assert_eq!(s.export_buyers(&by_status).await.unwrap().len(), 1);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
  let s = store().await;
  s.insert_buyer(draft("Plain Name", "9844444444"), None).await.unwrap();

  let filter = BuyerFilter {
    search: Some("%".into()),
    ..BuyerFilter::default()
  };
  assert!(s.export_buyers(&filter).await.unwrap().is_empty());
}

#[tokio::test]
async fn replace_keeps_identity_and_bumps_updated_at() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let created = s.insert_buyer(draft("Before", "9855555555"), Some(owner)).await.unwrap();

  let mut d = draft("After", "9855555555");
  d.property_type = PropertyType::Plot;
  d.bhk = None;
  let replaced = s.replace_buyer(created.id, d).await.unwrap().unwrap();

  assert_eq!(replaced.id, created.id);
  assert_eq!(replaced.owner_id, Some(owner));
  assert_eq!(replaced.created_at, created.created_at);
  assert!(replaced.updated_at >= created.updated_at);
  assert_eq!(replaced.full_name, "After");
  assert_eq!(replaced.bhk, None);

  assert_eq!(s.get_buyer(created.id).await.unwrap(), Some(replaced));
}

#[tokio::test]
async fn replace_and_delete_missing_return_none() {
  let s = store().await;
  let id = Uuid::new_v4();
  assert!(s.replace_buyer(id, draft("Nobody", "9866666666")).await.unwrap().is_none());
  assert!(s.delete_buyer(id).await.unwrap().is_none());
}

#[tokio::test]
async fn replace_racing_delete_never_recreates_the_buyer() {
  let s = store().await;
  for i in 0..20 {
    let created = s
      .insert_buyer(draft("Racing Lead", "9877777777"), Some(Uuid::new_v4()))
      .await
      .unwrap();

    let mut d = draft("Racing Lead", "9877777777");
    d.notes = Some(format!("edit {i}"));
    let (deleted, replaced) =
      tokio::join!(s.delete_buyer(created.id), s.replace_buyer(created.id, d));

    assert_eq!(deleted.unwrap().map(|b| b.id), Some(created.id));
    replaced.unwrap();
    assert_eq!(s.get_buyer(created.id).await.unwrap(), None);
  }
}

#[tokio::test]
async fn replace_after_delete_returns_none_and_update_is_not_found() {
  let s = store().await;
  let owner = user(&s, "owner@example.com", Role::User).await;
  let buyer = records::create(&s, &owner, &form("Gone Lead", "9812345678"), Source::Website)
    .await
    .unwrap();
  s.delete_buyer(buyer.id).await.unwrap();

  assert!(
    s.replace_buyer(buyer.id, draft("Gone Lead", "9812345678"))
      .await
      .unwrap()
      .is_none()
  );
  let err = records::update(&s, &owner, buyer.id, &form("Gone Lead", "9812345678"))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound(_)));
  assert_eq!(s.get_buyer(buyer.id).await.unwrap(), None);
}

// ─── History ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_is_newest_first_and_limited() {
  let s = store().await;
  let buyer = s.insert_buyer(draft("Hist", "9877777777"), None).await.unwrap();

  for (from, to) in [
    (Status::New, Status::Qualified),
    (Status::Qualified, Status::Contacted),
    (Status::Contacted, Status::Visited),
  ] {
    s.append_history(NewHistoryEntry {
      buyer_id:   buyer.id,
      changed_by: None,
      diff:       Change::StatusUpdated { from, to },
    })
    .await
    .unwrap();
  }

  let entries = s.list_history(buyer.id, 2).await.unwrap();
  assert_eq!(entries.len(), 2);
  assert_eq!(
    entries[0].diff,
    Change::StatusUpdated { from: Status::Contacted, to: Status::Visited }
  );
}

#[tokio::test]
async fn history_survives_buyer_deletion() {
  let s = store().await;
  let buyer = s.insert_buyer(draft("Gone", "9888888888"), None).await.unwrap();
  s.append_history(NewHistoryEntry {
    buyer_id:   buyer.id,
    changed_by: None,
    diff:       Change::Created(Box::new(buyer.clone())),
  })
  .await
  .unwrap();

  s.delete_buyer(buyer.id).await.unwrap().unwrap();
  assert_eq!(s.list_history(buyer.id, 20).await.unwrap().len(), 1);
}

// ─── User removal ────────────────────────────────────────────────────────────

#[tokio::test]
async fn remove_user_transfers_buyers_and_clears_actor() {
  let s = store().await;
  let agent = user(&s, "agent@example.com", Role::User).await;
  let admin = user(&s, "admin@example.com", Role::Admin).await;

  let buyer = records::create(&s, &agent, &form("Owned Lead", "9899999999"), Source::Website)
    .await
    .unwrap();

  let removal = s.remove_user(agent.id, Some(admin.id)).await.unwrap().unwrap();
  assert_eq!(removal.buyers, 1);
  assert_eq!(removal.transferred_to, Some(admin.id));

  let moved = s.get_buyer(buyer.id).await.unwrap().unwrap();
  assert_eq!(moved.owner_id, Some(admin.id));

  let entries = s.list_history(buyer.id, 20).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].changed_by, None);

  assert!(s.get_user(agent.id).await.unwrap().is_none());
  assert!(s.remove_user(agent.id, None).await.unwrap().is_none());
}

#[tokio::test]
async fn remove_user_without_target_orphans_buyers() {
  let s = store().await;
  let agent = user(&s, "agent@example.com", Role::User).await;
  let buyer = s.insert_buyer(draft("Orphan", "9800000000"), Some(agent.id)).await.unwrap();

  let removal = s.remove_user(agent.id, None).await.unwrap().unwrap();
  assert_eq!(removal.buyers, 1);
  assert_eq!(s.get_buyer(buyer.id).await.unwrap().unwrap().owner_id, None);
}

// ─── Records operations ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_records_snapshot_history() {
  let s = store().await;
  let agent = user(&s, "agent@example.com", Role::User).await;

  let buyer = records::create(&s, &agent, &form("Snap Shot", "9812345678"), Source::Website)
    .await
    .unwrap();
  assert_eq!(buyer.owner_id, Some(agent.id));
  assert_eq!(buyer.source, Source::Website);

  let entries = records::history(&s, buyer.id, None).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].changed_by, Some(agent.id));
  assert_eq!(entries[0].diff, Change::Created(Box::new(buyer)));
}

#[tokio::test]
async fn status_change_is_recorded_but_notes_edit_is_not() {
  let s = store().await;
  let agent = user(&s, "agent@example.com", Role::User).await;
  let buyer = records::create(&s, &agent, &form("Status Lead", "9812345678"), Source::Website)
    .await
    .unwrap();

  let mut notes_only = form("Status Lead", "9812345678");
  notes_only.notes = Some("called twice".into());
  records::update(&s, &agent, buyer.id, &notes_only).await.unwrap();
  assert_eq!(records::history(&s, buyer.id, None).await.unwrap().len(), 1);

  let mut qualified = notes_only.clone();
  qualified.status = Some("Qualified".into());
  let updated = records::update(&s, &agent, buyer.id, &qualified).await.unwrap();
  assert_eq!(updated.status, Status::Qualified);

  let entries = records::history(&s, buyer.id, None).await.unwrap();
  assert_eq!(entries.len(), 2);
  assert_eq!(
    entries[0].diff,
    Change::StatusUpdated { from: Status::New, to: Status::Qualified }
  );
}

#[tokio::test]
async fn non_owner_cannot_update_or_delete_but_admin_can() {
  let s = store().await;
  let owner = user(&s, "owner@example.com", Role::User).await;
  let other = user(&s, "other@example.com", Role::User).await;
  let admin = user(&s, "admin@example.com", Role::Admin).await;

  let buyer = records::create(&s, &owner, &form("Guarded", "9812345678"), Source::Website)
    .await
    .unwrap();

  let err = records::update(&s, &other, buyer.id, &form("Hijack", "9812345678"))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));
  let err = records::delete(&s, &other, buyer.id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  // Reads are not owner-scoped.
  assert_eq!(records::get(&s, buyer.id).await.unwrap().id, buyer.id);

  records::update(&s, &admin, buyer.id, &form("Admin Edit", "9812345678"))
    .await
    .unwrap();
  records::delete(&s, &admin, buyer.id).await.unwrap();
  assert!(matches!(
    records::get(&s, buyer.id).await.unwrap_err(),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn invalid_update_leaves_record_untouched() {
  let s = store().await;
  let owner = user(&s, "owner@example.com", Role::User).await;
  let buyer = records::create(&s, &owner, &form("Valid Name", "9812345678"), Source::Website)
    .await
    .unwrap();

  let err = records::update(&s, &owner, buyer.id, &form("Valid Name", "12"))
    .await
    .unwrap_err();
  match err {
    CoreError::Validation(errors) => assert!(errors.has("phone")),
    other => panic!("expected validation error, got {other:?}"),
  }
  assert_eq!(records::get(&s, buyer.id).await.unwrap(), buyer);
}

#[tokio::test]
async fn listing_is_scoped_to_owner_for_users() {
  let s = store().await;
  let a = user(&s, "a@example.com", Role::User).await;
  let b = user(&s, "b@example.com", Role::User).await;
  let admin = user(&s, "admin@example.com", Role::Admin).await;

  records::create(&s, &a, &form("Lead A", "9812345678"), Source::Website).await.unwrap();
  records::create(&s, &b, &form("Lead B", "9812345679"), Source::Website).await.unwrap();

  // A forged owner filter is overridden.
  let forged = BuyerFilter {
    owner_id: Some(b.id),
    ..BuyerFilter::default()
  };
  let page = records::list(&s, &a, forged, None, None).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].owner_id, Some(a.id));

  let all = records::export(&s, &admin, BuyerFilter::default()).await.unwrap();
  assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn history_of_missing_buyer_is_not_found() {
  let s = store().await;
  let err = records::history(&s, Uuid::new_v4(), None).await.unwrap_err();
  assert!(matches!(err, CoreError::NotFound(_)));
}

// ─── User operations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_by_email_or_trusted_id() {
  let s = store().await;
  let admin = user(&s, "admin@example.com", Role::Admin).await;

  let by_email = users::resolve(
    &s,
    &PrincipalClaim {
      email: "ADMIN@example.com".into(),
      ..PrincipalClaim::default()
    },
  )
  .await
  .unwrap();
  assert_eq!(by_email, admin);

  let trusted = Uuid::new_v4();
  let by_id = users::resolve(
    &s,
    &PrincipalClaim {
      email: "ghost@example.com".into(),
      id:    Some(trusted.to_string()),
      role:  None,
    },
  )
  .await
  .unwrap();
  assert_eq!(by_id.id, trusted);
  assert_eq!(by_id.role, Role::User);

  let missing = users::resolve(
    &s,
    &PrincipalClaim {
      email: "nobody@example.com".into(),
      id:    Some("not-a-uuid".into()),
      role:  None,
    },
  )
  .await
  .unwrap_err();
  assert!(matches!(missing, CoreError::NotFound(_)));

  let anonymous = users::resolve(&s, &PrincipalClaim::default()).await.unwrap_err();
  assert!(matches!(anonymous, CoreError::Unauthenticated));
}

#[tokio::test]
async fn admin_removal_transfers_to_oldest_other_admin() {
  let s = store().await;
  let first = user(&s, "first@example.com", Role::Admin).await;
  let second = user(&s, "second@example.com", Role::Admin).await;
  let agent = user(&s, "agent@example.com", Role::User).await;

  let buyer = records::create(&s, &agent, &form("Transfer Me", "9812345678"), Source::Website)
    .await
    .unwrap();

  let removal = users::remove(&s, &second, agent.id).await.unwrap();
  assert_eq!(removal.transferred_to, Some(first.id));
  assert_eq!(records::get(&s, buyer.id).await.unwrap().owner_id, Some(first.id));

  let err = users::remove(&s, &first, first.id).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));
}

#[tokio::test]
async fn role_change_requires_admin() {
  let s = store().await;
  let admin = user(&s, "admin@example.com", Role::Admin).await;
  let agent = user(&s, "agent@example.com", Role::User).await;

  let err = users::change_role(&s, &agent, admin.id, Role::User).await.unwrap_err();
  assert!(matches!(err, CoreError::Forbidden(_)));

  let promoted = users::change_role(&s, &admin, agent.id, Role::Admin).await.unwrap();
  assert_eq!(promoted.role, Role::Admin);

  let err = users::change_role(&s, &admin, Uuid::new_v4(), Role::Admin)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound(_)));
}
