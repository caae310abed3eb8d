use chrono::{Duration, Utc};
use manifestation::db::{ChangeSet, Database, ManifestationWrite, Repository};
use manifestation::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn candidate(wallet: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        wallet_address: wallet.to_string(),
        name: None,
        energy_level: 25,
        daily_streak: 0,
        total_manifestations: 0,
        completed_count: 0,
        daily_intent: None,
        last_active_at: now,
        created_at: now,
        updated_at: now,
    }
}

fn manifestation_for(user: &User, title: &str) -> Manifestation {
    let now = Utc::now();
    Manifestation {
        id: Uuid::new_v4(),
        owner_id: user.id,
        title: title.to_string(),
        description: Some("details".to_string()),
        emoji: DEFAULT_EMOJI.to_string(),
        state: ManifestationState::Dream,
        category: Some("Health".to_string()),
        tags: vec!["fitness".to_string(), "outdoors".to_string()],
        progress: 0,
        is_public: false,
        created_at: now,
        updated_at: now,
    }
}

fn insert(db: &Database, m: &Manifestation) {
    db.commit(&ChangeSet {
        manifestation: Some(ManifestationWrite::Insert(m)),
        ..Default::default()
    })
    .expect("Failed to insert manifestation");
}

fn community_entry(source: &Manifestation, author: &User) -> CommunityManifestation {
    let mut public = source.clone();
    public.is_public = true;
    CommunityManifestation::from_source(&public, Author::from_user(author), Utc::now())
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "users" {
        describe "find_or_create_user" {
            it "creates a user on first sight" {
                let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed to create user");

                assert_eq!(user.wallet_address, "0xaaa");
                assert_eq!(user.energy_level, 25);
            }

            it "returns the existing row for a known wallet" {
                let first = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
                let second = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");

                assert_eq!(first.id, second.id);
                assert_eq!(first.created_at, second.created_at);
            }
        }

        describe "get_user_by_wallet" {
            it "returns None for an unknown wallet" {
                let found = db.get_user_by_wallet("0xnobody").expect("Query failed");
                assert!(found.is_none());
            }
        }
    }

    describe "manifestations" {
        it "round trips every column" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let m = manifestation_for(&user, "Run a marathon");
            insert(&db, &m);

            let stored = db.get_manifestations_by_owner(user.id).expect("Query failed");

            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].title, "Run a marathon");
            assert_eq!(stored[0].tags, vec!["fitness", "outdoors"]);
            assert_eq!(stored[0].state, ManifestationState::Dream);
            assert_eq!(stored[0].category.as_deref(), Some("Health"));
        }

        it "filters by owner" {
            let alice = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let bob = db.find_or_create_user(&candidate("0xbbb")).expect("Failed");
            insert(&db, &manifestation_for(&alice, "Alice's goal"));
            insert(&db, &manifestation_for(&bob, "Bob's goal"));

            let stored = db.get_manifestations_by_owner(alice.id).expect("Query failed");

            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].title, "Alice's goal");
        }

        it "updates state and progress" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let mut m = manifestation_for(&user, "Learn Rust");
            insert(&db, &m);

            m.state = ManifestationState::Working;
            m.progress = 40;
            db.commit(&ChangeSet {
                manifestation: Some(ManifestationWrite::Update(&m)),
                ..Default::default()
            }).expect("Failed to update");

            let stored = db.get_manifestations_by_owner(user.id).expect("Query failed");
            assert_eq!(stored[0].state, ManifestationState::Working);
            assert_eq!(stored[0].progress, 40);
        }

        it "fails to update a missing row" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let m = manifestation_for(&user, "Never inserted");

            let result = db.commit(&ChangeSet {
                manifestation: Some(ManifestationWrite::Update(&m)),
                ..Default::default()
            });

            assert!(result.is_err());
        }

        it "fails to delete a missing row" {
            let result = db.commit(&ChangeSet {
                manifestation: Some(ManifestationWrite::Delete(Uuid::new_v4())),
                ..Default::default()
            });

            assert!(result.is_err());
        }
    }

    describe "commit" {
        it "writes the user and the manifestation together" {
            let mut user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let m = manifestation_for(&user, "Write a book");
            user.total_manifestations = 1;
            user.energy_level = 28;

            db.commit(&ChangeSet {
                user: Some(&user),
                manifestation: Some(ManifestationWrite::Insert(&m)),
                ..Default::default()
            }).expect("Commit failed");

            let stored = db.get_user_by_wallet("0xaaa").expect("Query failed").expect("User missing");
            assert_eq!(stored.total_manifestations, 1);
            assert_eq!(stored.energy_level, 28);
            assert_eq!(db.get_manifestations_by_owner(user.id).expect("Query failed").len(), 1);
        }

        it "rolls back the manifestation when the user write fails" {
            let owner = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let m = manifestation_for(&owner, "Half written");
            let ghost = candidate("0xghost");

            let result = db.commit(&ChangeSet {
                user: Some(&ghost),
                manifestation: Some(ManifestationWrite::Insert(&m)),
                ..Default::default()
            });

            assert!(result.is_err());
            assert!(db.get_manifestations_by_owner(owner.id).expect("Query failed").is_empty());
        }

        it "publishes a community entry with its source update" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let mut m = manifestation_for(&user, "Go public");
            insert(&db, &m);
            m.is_public = true;
            let entry = community_entry(&m, &user);

            db.commit(&ChangeSet {
                manifestation: Some(ManifestationWrite::Update(&m)),
                community: Some(&entry),
                ..Default::default()
            }).expect("Commit failed");

            assert!(db.get_manifestations_by_owner(user.id).expect("Query failed")[0].is_public);
            let pool = db.get_community_manifestations().expect("Query failed");
            assert_eq!(pool.len(), 1);
            assert_eq!(pool[0].source_id, m.id);
        }

        it "keeps the source private when the community write fails" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let mut m = manifestation_for(&user, "Shared twice");
            insert(&db, &m);
            let entry = community_entry(&m, &user);
            db.insert_community_manifestation(&entry).expect("Insert failed");
            m.is_public = true;

            let result = db.commit(&ChangeSet {
                manifestation: Some(ManifestationWrite::Update(&m)),
                community: Some(&entry),
                ..Default::default()
            });

            assert!(result.is_err());
            assert!(!db.get_manifestations_by_owner(user.id).expect("Query failed")[0].is_public);
            assert_eq!(db.get_community_manifestations().expect("Query failed").len(), 1);
        }

        it "drops the community entry when the source update fails" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let m = manifestation_for(&user, "Never inserted");
            let entry = community_entry(&m, &user);

            let result = db.commit(&ChangeSet {
                manifestation: Some(ManifestationWrite::Update(&m)),
                community: Some(&entry),
                ..Default::default()
            });

            assert!(result.is_err());
            assert!(db.get_community_manifestations().expect("Query failed").is_empty());
        }

        it "records daily intents" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let now = Utc::now();
            let intent = DailyIntent {
                id: Uuid::new_v4(),
                user_id: user.id,
                intent: "Be kind".to_string(),
                date: now.date_naive(),
                energy_boost: 8,
                created_at: now,
            };

            db.commit(&ChangeSet {
                daily_intent: Some(&intent),
                ..Default::default()
            }).expect("Commit failed");

            let intents = db.get_daily_intents(user.id).expect("Query failed");
            assert_eq!(intents.len(), 1);
            assert_eq!(intents[0].intent, "Be kind");
            assert_eq!(intents[0].date, now.date_naive());
        }
    }

    describe "community" {
        it "lists newest shares first" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let mut older = community_entry(&manifestation_for(&user, "Older"), &user);
            older.shared_at = Utc::now() - Duration::hours(1);
            let newer = community_entry(&manifestation_for(&user, "Newer"), &user);
            db.insert_community_manifestation(&older).expect("Insert failed");
            db.insert_community_manifestation(&newer).expect("Insert failed");

            let pool = db.get_community_manifestations().expect("Query failed");

            assert_eq!(pool.len(), 2);
            assert_eq!(pool[0].title, "Newer");
            assert_eq!(pool[1].title, "Older");
        }

        it "attaches likes, supporters and comments" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let entry = community_entry(&manifestation_for(&user, "Shared"), &user);
            db.insert_community_manifestation(&entry).expect("Insert failed");

            let now = Utc::now();
            db.set_interaction(entry.id, "0x111", InteractionKind::Like, true, now).expect("Failed");
            db.set_interaction(entry.id, "0x222", InteractionKind::Support, true, now).expect("Failed");
            db.insert_comment(entry.id, &CommunityComment {
                id: Uuid::new_v4(),
                author: CommentAuthor { name: "Bob".to_string(), address: "0x222".to_string() },
                content: "Go for it".to_string(),
                created_at: now,
            }).expect("Failed");

            let pool = db.get_community_manifestations().expect("Query failed");

            assert_eq!(pool[0].likes, vec!["0x111"]);
            assert_eq!(pool[0].supporters, vec!["0x222"]);
            assert_eq!(pool[0].comments.len(), 1);
            assert_eq!(pool[0].comments[0].author.name, "Bob");
        }

        it "treats interactions as idempotent set membership" {
            let user = db.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            let entry = community_entry(&manifestation_for(&user, "Shared"), &user);
            db.insert_community_manifestation(&entry).expect("Insert failed");
            let now = Utc::now();

            db.set_interaction(entry.id, "0x111", InteractionKind::Like, true, now).expect("Failed");
            db.set_interaction(entry.id, "0x111", InteractionKind::Like, true, now).expect("Failed");
            assert_eq!(db.get_community_manifestations().expect("Query failed")[0].likes.len(), 1);

            db.set_interaction(entry.id, "0x111", InteractionKind::Like, false, now).expect("Failed");
            db.set_interaction(entry.id, "0x111", InteractionKind::Like, false, now).expect("Failed");
            assert!(db.get_community_manifestations().expect("Query failed")[0].likes.is_empty());
        }
    }

    describe "file storage" {
        it "persists across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("journal.db");

            let first = Database::open(path.clone()).expect("Failed to open");
            first.migrate().expect("Failed to migrate");
            let user = first.find_or_create_user(&candidate("0xaaa")).expect("Failed");
            drop(first);

            let second = Database::open(path).expect("Failed to reopen");
            second.migrate().expect("Failed to migrate");
            let found = second.get_user_by_wallet("0xaaa").expect("Query failed");

            assert_eq!(found.map(|u| u.id), Some(user.id));
        }
    }
}
