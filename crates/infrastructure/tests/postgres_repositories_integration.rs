//! PostgreSQL repository integration tests
//!
//! Run with: cargo test --test postgres_repositories_integration -- --ignored

use flashplane_domain::{
    AuditAction, AuditEntry, AuditRepository, ConfigCommit, ConfigCommitRepository, DomainError,
    GroupMembershipRepository, GroupStorageRepository, Job, JobId, JobRepository, JobStatus,
    ProjectRepository, RequestContext, Resource, ResourceChangeSet, ResourceRepository,
    ResourceType, StoragePermission, StoragePermissionRepository,
};
use flashplane_infrastructure::persistence::{
    PostgresAuditRepository, PostgresConfigCommitRepository, PostgresJobRepository,
    PostgresResourceRepository, PostgresTenancyRepository,
};
use serde_json::json;

mod common;

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn test_job_lifecycle() {
    let db = common::test_database().await;
    let repo = PostgresJobRepository::new(db.pool.clone());

    let job = Job::queued(JobId::from("fj-1"), "proj-p1-alice", "p1", "u1").with_queue("gpu", 5);
    repo.create(&job).await.expect("Failed to create job");

    let found = repo
        .get(&job.id)
        .await
        .expect("Failed to get job")
        .expect("job should exist");
    assert_eq!(found.status, JobStatus::Queued);
    assert_eq!(found.queue_name, "gpu");
    assert_eq!(found.priority, 5);

    repo.update_status(&job.id, JobStatus::Failed, Some("no pod templates"))
        .await
        .expect("Failed to update status");
    let found = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(found.status, JobStatus::Failed);
    assert_eq!(found.error_message.as_deref(), Some("no pod templates"));

    let missing = repo
        .update_status(&JobId::from("ghost"), JobStatus::Running, None)
        .await
        .unwrap_err();
    assert!(matches!(missing, DomainError::JobNotFound { .. }));
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn test_job_queries_by_project_user_and_status() {
    let db = common::test_database().await;
    let repo = PostgresJobRepository::new(db.pool.clone());

    for (id, user, project) in [("a", "u1", "p1"), ("b", "u1", "p1"), ("c", "u2", "p1"), ("d", "u1", "p2")] {
        repo.create(&Job::queued(JobId::from(id), "ns", project, user))
            .await
            .unwrap();
    }
    repo.update_status(&JobId::from("b"), JobStatus::Running, None)
        .await
        .unwrap();
    repo.update_status(&JobId::from("c"), JobStatus::Completed, None)
        .await
        .unwrap();

    assert_eq!(repo.list_by_project("p1").await.unwrap().len(), 3);
    assert_eq!(repo.list_by_user("u1").await.unwrap().len(), 3);
    assert_eq!(repo.list_by_status(JobStatus::Queued).await.unwrap().len(), 2);

    let active = [JobStatus::Queued, JobStatus::Running];
    let p1_active = repo.list_by_project_and_statuses("p1", &active).await.unwrap();
    let mut ids: Vec<_> = p1_active.iter().map(|j| j.id.to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b"]);

    let count = repo
        .count_by_user_project_and_statuses("u1", "p1", &active)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn test_config_commit_and_resources() {
    let db = common::test_database().await;
    let commits = PostgresConfigCommitRepository::new(db.pool.clone());
    let resources = PostgresResourceRepository::new(db.pool.clone());

    let commit = ConfigCommit::new("p1", "u1", "initial", "kind: ConfigMap");
    commits.create(&commit).await.unwrap();
    commits
        .update_content(&commit.id, "kind: Job", "second")
        .await
        .unwrap();
    let stored = commits.get(&commit.id).await.unwrap().unwrap();
    assert_eq!(stored.content, "kind: Job");
    assert_eq!(stored.message, "second");
    assert_eq!(commits.list_by_project("p1").await.unwrap().len(), 1);

    let settings = Resource::new(
        commit.id,
        ResourceType::ConfigMap,
        "settings",
        json!({"kind": "ConfigMap", "metadata": {"name": "settings"}}),
    );
    let trainer = Resource::new(
        commit.id,
        ResourceType::Job,
        "trainer",
        json!({"kind": "Job", "metadata": {"name": "trainer"}}),
    );
    resources
        .apply_changes(&ResourceChangeSet {
            creates: vec![settings.clone(), trainer.clone()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(resources.list_by_config(&commit.id).await.unwrap().len(), 2);

    let mut updated = trainer.clone();
    updated.payload = json!({"kind": "Job", "metadata": {"name": "trainer", "labels": {"v": "2"}}});
    resources
        .apply_changes(&ResourceChangeSet {
            updates: vec![updated.clone()],
            deletes: vec![settings],
            ..Default::default()
        })
        .await
        .unwrap();

    let remaining = resources.list_by_config(&commit.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].payload, updated.payload);
    assert!(
        resources
            .get_by_name(&commit.id, "settings")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn test_audit_entries_in_order() {
    let db = common::test_database().await;
    let repo = PostgresAuditRepository::new(db.pool.clone());
    let ctx = RequestContext::system();

    for message in ["job queued", "job status refreshed", "job cancelled"] {
        let entry = AuditEntry::new(
            &ctx,
            AuditAction::Update,
            "job",
            "fj-1",
            None,
            Some(json!({"message": message})),
            message,
        );
        repo.save(&entry).await.unwrap();
    }

    let entries = repo.find_by_resource("job", "fj-1").await.unwrap();
    let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["job queued", "job status refreshed", "job cancelled"]);
    assert!(repo.find_by_resource("job", "other").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn test_commit_with_resources_rolls_back_together() {
    let db = common::test_database().await;
    let commits = PostgresConfigCommitRepository::new(db.pool.clone());
    let resources = PostgresResourceRepository::new(db.pool.clone());

    let commit = ConfigCommit::new("p1", "u1", "initial", "kind: ConfigMap");
    let settings = Resource::new(
        commit.id,
        ResourceType::ConfigMap,
        "settings",
        json!({"kind": "ConfigMap", "metadata": {"name": "settings"}}),
    );
    commits
        .create_with_resources(&commit, std::slice::from_ref(&settings))
        .await
        .unwrap();
    assert_eq!(resources.list_by_config(&commit.id).await.unwrap().len(), 1);

    // duplicate resource names violate the unique index
    let broken = ConfigCommit::new("p1", "u1", "broken", "kind: ConfigMap");
    let first = Resource::new(broken.id, ResourceType::ConfigMap, "dup", json!({}));
    let second = Resource::new(broken.id, ResourceType::ConfigMap, "dup", json!({}));
    let err = commits
        .create_with_resources(&broken, &[first, second])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PersistenceError { .. }));
    assert!(commits.get(&broken.id).await.unwrap().is_none());
    assert!(resources.list_by_config(&broken.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires Docker with PostgreSQL"]
async fn test_tenancy_lookups() {
    let db = common::test_database().await;
    let repo = PostgresTenancyRepository::new(db.pool.clone());

    for statement in [
        "INSERT INTO projects (id, name, group_id) VALUES ('p1', 'vision', 'g1')",
        r#"INSERT INTO projects (id, name, group_id, max_job_runtime_seconds, schedule_windows)
           VALUES ('p2', 'nlp', 'g1', 7200, '[{"weekday": 1, "start": "09:00", "end": "17:00"}]')"#,
        "INSERT INTO group_memberships (user_id, group_id, role) VALUES ('u1', 'g1', 'manager')",
        "INSERT INTO group_storages (id, group_id, claim_name, capacity_gi, created_at) VALUES ('s2', 'g1', 'datasets', 100, NOW())",
        "INSERT INTO group_storages (id, group_id, claim_name, capacity_gi, created_at) VALUES ('s1', 'g1', 'shared', 50, NOW() - INTERVAL '1 day')",
        "INSERT INTO storage_permissions (group_id, user_id, storage_id, permission, active) VALUES ('g1', 'u1', 's2', 'read', TRUE)",
    ] {
        sqlx::query(statement).execute(&db.pool).await.unwrap();
    }

    let project = ProjectRepository::get(&repo, "p1").await.unwrap().unwrap();
    assert_eq!(project.group_id, "g1");
    assert_eq!(project.job_deadline(), None);
    assert!(project.schedule_windows.is_empty());
    let limited = ProjectRepository::get(&repo, "p2").await.unwrap().unwrap();
    assert_eq!(limited.job_deadline(), Some(7200));
    assert_eq!(limited.schedule_windows[0].start, "09:00");
    assert!(ProjectRepository::get(&repo, "nope").await.unwrap().is_none());

    let membership = GroupMembershipRepository::get(&repo, "u1", "g1")
        .await
        .unwrap()
        .unwrap();
    assert!(membership.grants_write());

    let storages = repo.list_by_group("g1").await.unwrap();
    let claims: Vec<_> = storages.iter().map(|s| s.claim_name.as_str()).collect();
    assert_eq!(claims, vec!["shared", "datasets"]);

    let permission = repo.get_permission("g1", "u1", "s2").await.unwrap().unwrap();
    assert_eq!(permission.permission, StoragePermission::Read);
    assert!(permission.can_read());
    assert!(repo.get_permission("g1", "u1", "s1").await.unwrap().is_none());
}
