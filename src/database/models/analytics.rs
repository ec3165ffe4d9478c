use serde::Serialize;

use super::Module;

/// Record counts shown on the dashboard. Each section is present only when
/// the caller has access to the underlying module.
#[derive(Debug, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OverviewCounts {
    pub total_users: i64,
    pub active_users: i64,
    pub total_employees: i64,
    pub active_employees: i64,
    pub present_today: i64,
    pub pending_leaves: i64,
    pub active_projects: i64,
    pub open_tasks: i64,
    pub published_content: i64,
    pub pending_payroll: i64,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<UserStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hr: Option<HrStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<WorkStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payroll: Option<PayrollStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HrStats {
    pub total_employees: i64,
    pub active_employees: i64,
    pub present_today: i64,
    pub pending_leaves: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkStats {
    pub active_projects: i64,
    pub open_tasks: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub published: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollStats {
    pub pending: i64,
}

impl AnalyticsOverview {
    /// Keeps only the sections whose module passes `has_access`.
    pub fn build(counts: OverviewCounts, has_access: impl Fn(Module) -> bool) -> Self {
        Self {
            users: has_access(Module::Users).then(|| UserStats {
                total: counts.total_users,
                active: counts.active_users,
            }),
            hr: has_access(Module::Employees).then(|| HrStats {
                total_employees: counts.total_employees,
                active_employees: counts.active_employees,
                present_today: counts.present_today,
                pending_leaves: counts.pending_leaves,
            }),
            work: (has_access(Module::Projects) || has_access(Module::Tasks)).then(|| {
                WorkStats {
                    active_projects: counts.active_projects,
                    open_tasks: counts.open_tasks,
                }
            }),
            content: has_access(Module::Content).then(|| ContentStats {
                published: counts.published_content,
            }),
            payroll: has_access(Module::Payroll).then(|| PayrollStats {
                pending: counts.pending_payroll,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_follow_module_access() {
        let counts = OverviewCounts {
            total_users: 12,
            active_users: 10,
            open_tasks: 7,
            ..Default::default()
        };

        let overview = AnalyticsOverview::build(counts, |module| {
            matches!(module, Module::Users | Module::Tasks)
        });

        assert_eq!(overview.users.as_ref().map(|u| u.active), Some(10));
        assert_eq!(overview.work.as_ref().map(|w| w.open_tasks), Some(7));
        assert!(overview.hr.is_none());
        assert!(overview.payroll.is_none());

        let json = serde_json::to_value(&overview).unwrap();
        assert!(json.get("hr").is_none());
        assert_eq!(json["users"]["total"], 12);
    }
}
