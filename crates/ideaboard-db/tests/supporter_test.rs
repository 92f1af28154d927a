//! Integration tests for idea supporters using in-memory SurrealDB.

use ideaboard_core::models::idea::{CreateIdea, Idea, IdeaStatus, SetResponse};
use ideaboard_core::models::tenant::CreateTenant;
use ideaboard_core::models::user::{CreateUser, User, UserRole};
use ideaboard_core::repository::{IdeaRepository, TenantRepository, UserRepository};
use ideaboard_db::repository::{
    SurrealIdeaRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create a tenant with two
/// users and one idea, plus a second tenant with its own user.
async fn setup() -> (
    SurrealIdeaRepository<Db>,
    Uuid, // tenant_id
    User, // jon (author, administrator)
    User, // arya
    Idea,
    User, // user of another tenant
) {
    let db: Surreal<Db> = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    ideaboard_db::run_migrations(&db).await.unwrap();

    let tenants = SurrealTenantRepository::new(db.clone());
    let users = SurrealUserRepository::new(db.clone());
    let ideas = SurrealIdeaRepository::new(db);

    let tenant = tenants
        .create(CreateTenant {
            name: "Demonstration".into(),
            subdomain: "demo".into(),
        })
        .await
        .unwrap();
    let other = tenants
        .create(CreateTenant {
            name: "Other".into(),
            subdomain: "other".into(),
        })
        .await
        .unwrap();

    let user = |tenant_id: Uuid, name: &str, email: &str, role: UserRole| CreateUser {
        tenant_id,
        name: name.into(),
        email: email.into(),
        role,
    };

    let jon = users
        .create(user(tenant.id, "Jon Snow", "jon@got.com", UserRole::Administrator))
        .await
        .unwrap();
    let arya = users
        .create(user(tenant.id, "Arya Stark", "arya@got.com", UserRole::Member))
        .await
        .unwrap();
    let sansa = users
        .create(user(other.id, "Sansa Stark", "sansa@got.com", UserRole::Member))
        .await
        .unwrap();

    let idea = ideas
        .save(CreateIdea {
            tenant_id: tenant.id,
            user_id: jon.id,
            title: "My new idea".into(),
            description: "with this description".into(),
        })
        .await
        .unwrap();

    (ideas, tenant.id, jon, arya, idea, sansa)
}

async fn close(repo: &SurrealIdeaRepository<Db>, tenant_id: Uuid, idea: &Idea, by: &User) {
    repo.set_response(
        tenant_id,
        idea.id,
        SetResponse {
            user_id: by.id,
            text: "We liked this idea".into(),
            status: IdeaStatus::Completed,
        },
    )
    .await
    .unwrap();
}

async fn supporters(repo: &SurrealIdeaRepository<Db>, tenant_id: Uuid) -> u32 {
    repo.get_by_number(tenant_id, 1)
        .await
        .unwrap()
        .total_supporters
}

#[tokio::test]
async fn add_supporter() {
    let (repo, tenant_id, jon, arya, idea, _) = setup().await;

    repo.add_supporter(tenant_id, jon.id, idea.id).await.unwrap();
    repo.add_supporter(tenant_id, arya.id, idea.id).await.unwrap();

    assert_eq!(supporters(&repo, tenant_id).await, 2);
}

#[tokio::test]
async fn add_supporter_twice() {
    let (repo, tenant_id, jon, _, idea, _) = setup().await;

    repo.add_supporter(tenant_id, jon.id, idea.id).await.unwrap();
    repo.add_supporter(tenant_id, jon.id, idea.id).await.unwrap();

    assert_eq!(supporters(&repo, tenant_id).await, 1);
}

#[tokio::test]
async fn remove_supporter() {
    let (repo, tenant_id, jon, _, idea, _) = setup().await;

    repo.add_supporter(tenant_id, jon.id, idea.id).await.unwrap();
    repo.remove_supporter(tenant_id, jon.id, idea.id).await.unwrap();

    assert_eq!(supporters(&repo, tenant_id).await, 0);
}

#[tokio::test]
async fn remove_supporter_twice() {
    let (repo, tenant_id, jon, arya, idea, _) = setup().await;

    repo.add_supporter(tenant_id, jon.id, idea.id).await.unwrap();
    repo.add_supporter(tenant_id, arya.id, idea.id).await.unwrap();
    repo.remove_supporter(tenant_id, jon.id, idea.id).await.unwrap();
    repo.remove_supporter(tenant_id, jon.id, idea.id).await.unwrap();

    assert_eq!(supporters(&repo, tenant_id).await, 1);
}

#[tokio::test]
async fn add_supporter_to_closed_idea_is_ignored() {
    let (repo, tenant_id, jon, _, idea, _) = setup().await;

    close(&repo, tenant_id, &idea, &jon).await;
    repo.add_supporter(tenant_id, jon.id, idea.id).await.unwrap();

    assert_eq!(supporters(&repo, tenant_id).await, 0);
    assert!(repo.supported_by(tenant_id, jon.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn remove_supporter_from_closed_idea_is_ignored() {
    let (repo, tenant_id, jon, _, idea, _) = setup().await;

    repo.add_supporter(tenant_id, jon.id, idea.id).await.unwrap();
    close(&repo, tenant_id, &idea, &jon).await;
    repo.remove_supporter(tenant_id, jon.id, idea.id).await.unwrap();

    assert_eq!(supporters(&repo, tenant_id).await, 1);
    assert_eq!(repo.supported_by(tenant_id, jon.id).await.unwrap(), vec![idea.id]);
}

#[tokio::test]
async fn supported_by_lists_supported_ideas() {
    let (repo, tenant_id, jon, arya, idea, _) = setup().await;

    let second = repo
        .save(CreateIdea {
            tenant_id,
            user_id: arya.id,
            title: "Second".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    repo.add_supporter(tenant_id, arya.id, idea.id).await.unwrap();
    repo.add_supporter(tenant_id, arya.id, second.id).await.unwrap();
    repo.add_supporter(tenant_id, jon.id, second.id).await.unwrap();

    let mut supported = repo.supported_by(tenant_id, arya.id).await.unwrap();
    supported.sort();
    let mut expected = vec![idea.id, second.id];
    expected.sort();

    assert_eq!(supported, expected);
    assert_eq!(repo.supported_by(tenant_id, jon.id).await.unwrap(), vec![second.id]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn supporters_are_frozen_once_a_racing_close_returns() {
    const ROUNDS: usize = 10;
    const BACKERS: usize = 6;

    let db: Surreal<Db> = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    ideaboard_db::run_migrations(&db).await.unwrap();

    let tenants = SurrealTenantRepository::new(db.clone());
    let users = SurrealUserRepository::new(db.clone());
    let ideas = SurrealIdeaRepository::new(db);

    let tenant = tenants
        .create(CreateTenant {
            name: "Race".into(),
            subdomain: "race".into(),
        })
        .await
        .unwrap();

    let mut backers = Vec::new();
    for i in 0..BACKERS {
        let user = users
            .create(CreateUser {
                tenant_id: tenant.id,
                name: format!("Backer {i}"),
                email: format!("backer{i}@got.com"),
                role: UserRole::Member,
            })
            .await
            .unwrap();
        backers.push(user);
    }
    let admin = backers[0].clone();

    for round in 0..ROUNDS {
        let idea = ideas
            .save(CreateIdea {
                tenant_id: tenant.id,
                user_id: admin.id,
                title: format!("Idea {round}"),
                description: String::new(),
            })
            .await
            .unwrap();

        let adds: Vec<_> = backers
            .iter()
            .map(|backer| {
                let ideas = ideas.clone();
                let (tenant_id, user_id, idea_id) = (tenant.id, backer.id, idea.id);
                tokio::spawn(async move {
                    ideas.add_supporter(tenant_id, user_id, idea_id).await
                })
            })
            .collect();

        let closing = {
            let ideas = ideas.clone();
            let (tenant_id, idea_id, admin_id) = (tenant.id, idea.id, admin.id);
            tokio::spawn(async move {
                ideas
                    .set_response(
                        tenant_id,
                        idea_id,
                        SetResponse {
                            user_id: admin_id,
                            text: "Shipped".into(),
                            status: IdeaStatus::Completed,
                        },
                    )
                    .await
                    .unwrap();
                ideas
                    .get_by_id(tenant_id, idea_id)
                    .await
                    .unwrap()
                    .total_supporters
            })
        };

        for add in adds {
            add.await.unwrap().unwrap();
        }
        let at_close = closing.await.unwrap();

        let after = ideas.get_by_id(tenant.id, idea.id).await.unwrap();
        assert_eq!(after.status, IdeaStatus::Completed);
        assert_eq!(
            after.total_supporters, at_close,
            "round {round}: count changed after the idea was closed"
        );

        let mut edges = 0;
        for backer in &backers {
            let supported = ideas.supported_by(tenant.id, backer.id).await.unwrap();
            if supported.contains(&idea.id) {
                edges += 1;
            }
        }
        assert_eq!(after.total_supporters, edges, "round {round}: count drifted from edges");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_supporters_are_all_counted() {
    let (repo, tenant_id, jon, arya, idea, _) = setup().await;

    let handles: Vec<_> = [jon.id, arya.id, jon.id, arya.id]
        .into_iter()
        .map(|user_id| {
            let repo = repo.clone();
            let idea_id = idea.id;
            tokio::spawn(async move { repo.add_supporter(tenant_id, user_id, idea_id).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(supporters(&repo, tenant_id).await, 2);
}

#[tokio::test]
async fn supporter_must_belong_to_tenant() {
    let (repo, tenant_id, _, _, idea, sansa) = setup().await;

    let err = repo
        .add_supporter(tenant_id, sansa.id, idea.id)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(supporters(&repo, tenant_id).await, 0);
}

#[tokio::test]
async fn supporting_other_tenant_idea_is_not_found() {
    let (repo, _, _, _, idea, sansa) = setup().await;

    let err = repo
        .add_supporter(sansa.tenant_id, sansa.id, idea.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = repo
        .remove_supporter(sansa.tenant_id, sansa.id, idea.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
