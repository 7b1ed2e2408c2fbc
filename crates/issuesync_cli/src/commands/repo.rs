use console::{Term, style};
use issuesync::connect_and_migrate;
use issuesync::store;

use crate::RepoAction;

pub(crate) async fn handle_repo(
    action: RepoAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = connect_and_migrate(database_url).await?;
    let is_tty = Term::stdout().is_term();

    match action {
        RepoAction::Add {
            full_name,
            remote_id,
            project,
        } => {
            let project_name = match project {
                Some(name) => name,
                None => default_project_name(&full_name).to_string(),
            };
            let (repo, project) =
                store::targets::register(&db, &full_name, remote_id, &project_name).await?;

            if is_tty {
                println!(
                    "Registered {} ({})",
                    style(&repo.full_name).bold(),
                    style(repo.id).cyan()
                );
                println!("  Default project: {} ({})", project.name, project.id);
            } else {
                tracing::info!(
                    repository_id = %repo.id,
                    project_id = %project.id,
                    full_name = %repo.full_name,
                    "Repository registered"
                );
            }
        }
        RepoAction::List => {
            let repos = store::targets::list_repositories(&db).await?;
            if repos.is_empty() {
                println!("No repositories registered. Use `issuesync repo add <owner/name>`.");
            }
            for repo in repos {
                let issues = store::issues::count_by_repository(&db, repo.id).await?;
                let last_job = store::jobs::list_by_repository(&db, repo.id, 1).await?;
                let last = last_job
                    .first()
                    .map(|job| format!("last sync {} ({})", job.status, job.created_at.format("%Y-%m-%d %H:%M")))
                    .unwrap_or_else(|| "never synced".to_string());
                println!(
                    "{}  {:<40} {:>6} issues  {}",
                    repo.id,
                    repo.full_name,
                    issues,
                    style(last).dim()
                );
            }
        }
    }

    Ok(())
}

/// Project name used when `--project` is omitted: the repository's name.
fn default_project_name(full_name: &str) -> &str {
    full_name
        .rsplit_once('/')
        .map_or(full_name, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_project_name_uses_repo_segment() {
        assert_eq!(default_project_name("octo/widgets"), "widgets");
        assert_eq!(default_project_name("widgets"), "widgets");
    }
}
