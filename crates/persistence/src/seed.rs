//! Default notice content for a fresh database.

use chrono::Local;
use tracing::{info, warn};

use crate::executor::QueryExecutor;
use crate::types::SqlValue;

/// A notice inserted by [`seed_notices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedNotice {
    pub title: &'static str,
    pub content: &'static str,
    pub is_important: bool,
}

/// The notices a new installation starts with.
pub const DEFAULT_NOTICES: [SeedNotice; 5] = [
    SeedNotice {
        title: "系统维护通知",
        content: "尊敬的用户，我们的系统将于2023年5月15日凌晨2:00-4:00进行例行维护，期间部分功能可能无法正常使用。给您带来的不便，敬请谅解。",
        is_important: true,
    },
    SeedNotice {
        title: "五一假期预约变更通知",
        content: "尊敬的用户，五一假期(5月1日-5月5日)期间，园区预约规则调整为每日限量100个预约名额。同时，园区开放时间延长至晚上8:00。欢迎您的到来。",
        is_important: true,
    },
    SeedNotice {
        title: "园区设施更新完成",
        content: "通知：园区主楼设施已完成更新，现已增设自助服务终端3台，休息区2处，饮水点4处，可更好地为您提供便捷服务。",
        is_important: false,
    },
    SeedNotice {
        title: "新版系统上线公告",
        content: "欢迎使用慧眼通途预约系统V2.0版本。本次更新优化了预约流程，新增了车辆管理功能，修复了已知问题。如有使用问题，请联系客服。",
        is_important: false,
    },
    SeedNotice {
        title: "用户须知更新",
        content: "重要提示：为保障园区安全和服务质量，自2023年6月1日起，所有访客需要提前24小时完成线上预约，临时访问需到前台登记并验证身份信息。感谢您的理解与配合。",
        is_important: true,
    },
];

/// Outcome of [`seed_notices`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    /// Notices whose title was already present.
    pub skipped: usize,
    pub failed: usize,
}

/// Inserts [`DEFAULT_NOTICES`] through `executor`, published now and enabled.
///
/// A notice whose title already exists is left alone, so running this twice
/// does not duplicate content.
pub async fn seed_notices(executor: &dyn QueryExecutor) -> SeedReport {
    let mut report = SeedReport::default();
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    for notice in &DEFAULT_NOTICES {
        let existing = executor
            .execute(
                "SELECT id FROM notices WHERE title = ? LIMIT 1",
                vec![notice.title.into()],
            )
            .await;
        if !existing.rows().is_empty() {
            report.skipped += 1;
            continue;
        }

        let result = executor
            .execute(
                "INSERT INTO notices (title, content, publish_time, is_important, status) \
                 VALUES (?, ?, ?, ?, ?)",
                vec![
                    notice.title.into(),
                    notice.content.into(),
                    SqlValue::Text(now.clone()),
                    notice.is_important.into(),
                    SqlValue::Integer(1),
                ],
            )
            .await
            .mutation();

        if result.changed() {
            info!(title = notice.title, id = result.insert_id, "Notice seeded");
            report.inserted += 1;
        } else {
            warn!(title = notice.title, "Notice could not be seeded");
            report.failed += 1;
        }
    }

    report
}
