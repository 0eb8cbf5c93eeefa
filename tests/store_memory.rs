// std
use std::sync::Arc;
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use token_rotor::{
	auth::{RefreshTokenRecord, RefreshTokenStatus, TokenSecret, UserId},
	store::{MemoryStore, RefreshTokenStore, Revocation, RotateOutcome},
};

const T0: OffsetDateTime = macros::datetime!(2025-11-10 12:00 UTC);

fn user(id: &str) -> UserId {
	UserId::new(id).expect("User identifier fixture should be valid.")
}

fn build_record(owner: &str, value: &str, issued_at: OffsetDateTime) -> RefreshTokenRecord {
	RefreshTokenRecord::new(
		TokenSecret::new(value),
		user(owner),
		issued_at,
		issued_at + Duration::days(7),
		None,
	)
}

fn at(offset: Duration) -> Revocation {
	Revocation::new(T0 + offset, None)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotations_have_a_single_winner() {
	let store = Arc::new(MemoryStore::default());

	store
		.insert(build_record("alice", "r1", T0))
		.await
		.expect("Seeding the memory store should succeed.");

	let mut handles = Vec::new();

	for attempt in 0..16 {
		let store = store.clone();

		handles.push(tokio::spawn(async move {
			let successor = build_record("alice", &format!("r2-{attempt}"), T0);

			store.rotate("r1", successor, at(Duration::minutes(1))).await
		}));
	}

	let mut outcomes = Vec::new();

	for handle in handles {
		outcomes.push(
			handle
				.await
				.expect("Rotation task should not panic.")
				.expect("Rotation should not hit a storage error."),
		);
	}

	let winners = outcomes.iter().filter(|outcome| **outcome == RotateOutcome::Rotated).count();
	let losers =
		outcomes.iter().filter(|outcome| **outcome == RotateOutcome::AlreadyRotated).count();

	assert_eq!(winners, 1);
	assert_eq!(losers, 15);
	// The predecessor plus exactly one successor.
	assert_eq!(store.len(), 2);

	let predecessor = store
		.fetch("r1")
		.await
		.expect("Fetching the predecessor should succeed.")
		.expect("Rotated records are retained.");
	let successor = predecessor.replaced_by.clone().expect("Winner should be linked.");

	assert_eq!(predecessor.status_at(T0 + Duration::minutes(2)), RefreshTokenStatus::Rotated);
	assert!(
		store
			.fetch(successor.expose())
			.await
			.expect("Fetching the successor should succeed.")
			.is_some_and(|record| record.is_active_at(T0 + Duration::minutes(2)))
	);
}

#[tokio::test]
async fn revoke_all_touches_only_active_records_of_the_user() {
	let store = MemoryStore::default();

	store.insert(build_record("alice", "a1", T0)).await.expect("Insert should succeed.");
	store
		.insert(build_record("alice", "a2", T0 + Duration::hours(1)))
		.await
		.expect("Insert should succeed.");
	store.insert(build_record("bob", "b1", T0)).await.expect("Insert should succeed.");
	store
		.rotate("a1", build_record("alice", "a3", T0), at(Duration::minutes(5)))
		.await
		.expect("Rotation should succeed.");

	// a2 and a3 are active; a1 is already rotated.
	assert_eq!(
		store
			.revoke_all(&user("alice"), at(Duration::hours(2)))
			.await
			.expect("Revoke-all should succeed."),
		2
	);

	let alice = store.fetch_for_user(&user("alice")).await.expect("Listing should succeed.");

	assert_eq!(alice.len(), 3);
	assert_eq!(alice[0].token.expose(), "a2");
	assert!(alice.iter().all(|record| record.is_revoked()));

	let a1 = store.fetch("a1").await.expect("Fetch should succeed.").expect("a1 is retained.");

	assert_eq!(a1.revoked_at, Some(T0 + Duration::minutes(5)));
	assert_eq!(a1.status(), RefreshTokenStatus::Rotated);
	assert!(
		store
			.fetch("b1")
			.await
			.expect("Fetch should succeed.")
			.is_some_and(|record| !record.is_revoked())
	);
}

#[tokio::test]
async fn revoking_descendants_follows_the_whole_chain() {
	let store = MemoryStore::default();

	store.insert(build_record("alice", "r1", T0)).await.expect("Insert should succeed.");

	for (from, to, minute) in [("r1", "r2", 1), ("r2", "r3", 2), ("r3", "r4", 3)] {
		assert_eq!(
			store
				.rotate(from, build_record("alice", to, T0), at(Duration::minutes(minute)))
				.await
				.expect("Rotation should succeed."),
			RotateOutcome::Rotated
		);
	}

	assert_eq!(
		store
			.revoke_descendants("r2", at(Duration::minutes(10)))
			.await
			.expect("Revoking descendants should succeed."),
		1
	);

	let r4 = store.fetch("r4").await.expect("Fetch should succeed.").expect("r4 is retained.");

	assert_eq!(r4.status(), RefreshTokenStatus::Revoked);
	assert!(
		store
			.rotate("r4", build_record("alice", "r5", T0), at(Duration::minutes(11)))
			.await
			.is_ok_and(|outcome| outcome == RotateOutcome::Revoked)
	);
}
