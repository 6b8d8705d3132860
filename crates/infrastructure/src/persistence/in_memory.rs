// In-memory Repositories
// Implementaciones en memoria para tests y desarrollo local

use flashplane_domain::{
    AccessPermission, AuditEntry, AuditRepository, ConfigCommit, ConfigCommitId,
    ConfigCommitRepository, DomainError, GroupMembership, GroupMembershipRepository, GroupStorage,
    GroupStorageRepository, Job, JobId, JobRepository, JobStatus, Project, ProjectRepository,
    Resource, ResourceChangeSet, ResourceId, ResourceRepository, Result,
    StoragePermissionRepository,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Repositorio en memoria para Jobs
#[derive(Clone, Default)]
pub struct InMemoryJobRepository {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered(&self, predicate: impl Fn(&Job) -> bool) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut out: Vec<Job> = jobs.values().filter(|job| predicate(job)).cloned().collect();
        out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        out
    }
}

#[async_trait::async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(DomainError::PersistenceError {
                message: format!("job {} already exists", job.id),
            });
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn update_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(job_id).ok_or_else(|| DomainError::JobNotFound {
            job_id: job_id.clone(),
        })?;
        job.status = status;
        job.error_message = error_message.map(str::to_string);
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<Job>> {
        Ok(self.filtered(|job| job.project_id == project_id).await)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Job>> {
        Ok(self.filtered(|job| job.user_id == user_id).await)
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        Ok(self.filtered(|job| job.status == status).await)
    }

    async fn list_by_project_and_statuses(
        &self,
        project_id: &str,
        statuses: &[JobStatus],
    ) -> Result<Vec<Job>> {
        Ok(self
            .filtered(|job| job.project_id == project_id && statuses.contains(&job.status))
            .await)
    }

    async fn count_by_user_project_and_statuses(
        &self,
        user_id: &str,
        project_id: &str,
        statuses: &[JobStatus],
    ) -> Result<u64> {
        let jobs = self
            .filtered(|job| {
                job.user_id == user_id
                    && job.project_id == project_id
                    && statuses.contains(&job.status)
            })
            .await;
        Ok(jobs.len() as u64)
    }
}

/// Commits plus the resource store that `create_with_resources` writes to
#[derive(Clone, Default)]
pub struct InMemoryConfigCommitRepository {
    commits: Arc<RwLock<HashMap<ConfigCommitId, ConfigCommit>>>,
    resources: InMemoryResourceRepository,
}

impl InMemoryConfigCommitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares `resources` so initial resources land where readers look
    pub fn with_resources(resources: InMemoryResourceRepository) -> Self {
        Self {
            commits: Arc::default(),
            resources,
        }
    }
}

#[async_trait::async_trait]
impl ConfigCommitRepository for InMemoryConfigCommitRepository {
    async fn create(&self, commit: &ConfigCommit) -> Result<()> {
        self.commits.write().await.insert(commit.id, commit.clone());
        Ok(())
    }

    async fn create_with_resources(&self, commit: &ConfigCommit, resources: &[Resource]) -> Result<()> {
        // resources first: a failed write leaves no commit behind
        let changes = ResourceChangeSet {
            creates: resources.to_vec(),
            ..ResourceChangeSet::default()
        };
        self.resources.apply_changes(&changes).await?;
        self.create(commit).await
    }

    async fn get(&self, id: &ConfigCommitId) -> Result<Option<ConfigCommit>> {
        Ok(self.commits.read().await.get(id).cloned())
    }

    async fn update_content(&self, id: &ConfigCommitId, content: &str, message: &str) -> Result<()> {
        let mut commits = self.commits.write().await;
        let commit = commits
            .get_mut(id)
            .ok_or(DomainError::ConfigCommitNotFound { commit_id: *id })?;
        commit.content = content.to_string();
        commit.message = message.to_string();
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<ConfigCommit>> {
        let commits = self.commits.read().await;
        let mut out: Vec<_> = commits
            .values()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryResourceRepository {
    resources: Arc<RwLock<HashMap<ResourceId, Resource>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later `apply_changes` fails without writing
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn list_by_config(&self, config_commit_id: &ConfigCommitId) -> Result<Vec<Resource>> {
        let resources = self.resources.read().await;
        let mut out: Vec<_> = resources
            .values()
            .filter(|r| &r.config_commit_id == config_commit_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(out)
    }

    async fn get_by_name(
        &self,
        config_commit_id: &ConfigCommitId,
        name: &str,
    ) -> Result<Option<Resource>> {
        let resources = self.resources.read().await;
        Ok(resources
            .values()
            .find(|r| &r.config_commit_id == config_commit_id && r.name == name)
            .cloned())
    }

    async fn apply_changes(&self, changes: &ResourceChangeSet) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::PersistenceError {
                message: "resource store is read-only".to_string(),
            });
        }
        let mut resources = self.resources.write().await;
        for resource in &changes.deletes {
            resources.remove(&resource.id);
        }
        for resource in changes.updates.iter().chain(changes.creates.iter()) {
            resources.insert(resource.id, resource.clone());
        }
        Ok(())
    }
}

/// Keeps entries in insertion order
#[derive(Clone, Default)]
pub struct InMemoryAuditRepository {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait::async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn save(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn find_by_resource(&self, resource_type: &str, resource_id: &str) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.resource_type == resource_type && e.resource_id == resource_id)
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryProjectRepository {
    projects: Arc<RwLock<HashMap<String, Project>>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, project: Project) {
        self.projects.write().await.insert(project.id.clone(), project);
    }
}

#[async_trait::async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn get(&self, project_id: &str) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(project_id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryGroupMembershipRepository {
    memberships: Arc<RwLock<HashMap<(String, String), GroupMembership>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryGroupMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the membership for (user, group)
    pub async fn insert(&self, membership: GroupMembership) {
        let key = (membership.user_id.clone(), membership.group_id.clone());
        self.memberships.write().await.insert(key, membership);
    }

    /// Every later lookup fails, as an unreachable database would
    pub async fn fail_lookups(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl GroupMembershipRepository for InMemoryGroupMembershipRepository {
    async fn get(&self, user_id: &str, group_id: &str) -> Result<Option<GroupMembership>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::PersistenceError {
                message: "membership store unavailable".to_string(),
            });
        }
        let key = (user_id.to_string(), group_id.to_string());
        Ok(self.memberships.read().await.get(&key).cloned())
    }
}

/// Keeps storages in insertion order; the first one is the group default
#[derive(Clone, Default)]
pub struct InMemoryGroupStorageRepository {
    storages: Arc<RwLock<Vec<GroupStorage>>>,
}

impl InMemoryGroupStorageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, storage: GroupStorage) {
        self.storages.write().await.push(storage);
    }
}

#[async_trait::async_trait]
impl GroupStorageRepository for InMemoryGroupStorageRepository {
    async fn list_by_group(&self, group_id: &str) -> Result<Vec<GroupStorage>> {
        let storages = self.storages.read().await;
        Ok(storages
            .iter()
            .filter(|s| s.group_id == group_id)
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStoragePermissionRepository {
    permissions: Arc<RwLock<HashMap<(String, String, String), AccessPermission>>>,
}

impl InMemoryStoragePermissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, permission: AccessPermission) {
        let key = (
            permission.group_id.clone(),
            permission.user_id.clone(),
            permission.storage_id.clone(),
        );
        self.permissions.write().await.insert(key, permission);
    }
}

#[async_trait::async_trait]
impl StoragePermissionRepository for InMemoryStoragePermissionRepository {
    async fn get_permission(
        &self,
        group_id: &str,
        user_id: &str,
        storage_id: &str,
    ) -> Result<Option<AccessPermission>> {
        let key = (
            group_id.to_string(),
            user_id.to_string(),
            storage_id.to_string(),
        );
        Ok(self.permissions.read().await.get(&key).cloned())
    }
}
