//! Text builders for status and detail replies.
//!
//! Lines are assembled here so the controller only decides what to report, not how.

use crate::accumulator::{format_date, Cost, Elapsed};
use crate::model::ServerSnapshot;

const UNSET: &str = "未設定";
const UNKNOWN: &str = "不明";

/// Short status: state, launch time, tracked running time and cost.
pub(crate) fn build_status_text(server: &ServerSnapshot, elapsed: Elapsed, cost: Cost) -> String {
    let lines = [
        format!("サーバーの状態: {}", server.status),
        format!("起動時間: {}", format_date(server.launched_at.as_deref())),
        format!("稼働時間: {elapsed}"),
        format!("料金: {cost}"),
    ];
    lines.join("\n")
}

/// Markdown bullet list with the full snapshot.
pub(crate) fn build_details_text(server: &ServerSnapshot, elapsed: Elapsed, cost: Cost) -> String {
    let mut lines = vec!["**サーバー詳細情報**".to_string(), String::new()];

    lines.push(format!("- 名前: {}", server.name));
    lines.push(format!("- ID: {}", server.id));
    lines.push(format!("- 状態: {}", server.status));
    lines.push(format!(
        "- 起動時間: {}",
        format_date(server.launched_at.as_deref())
    ));
    lines.push(format!("- 稼働時間: {elapsed}"));
    lines.push(format!("- 料金: {cost}"));
    lines.push(format!(
        "- プライベートIPv4: {}",
        server.private_ipv4().unwrap_or(UNSET)
    ));
    lines.push(format!(
        "- プライベートIPv6: {}",
        server.private_ipv6().unwrap_or(UNSET)
    ));
    lines.push(format!(
        "- フレーバー: {}",
        server.flavor.as_deref().unwrap_or(UNKNOWN)
    ));
    lines.push(format!(
        "- イメージ: {}",
        server.image.as_deref().unwrap_or(UNKNOWN)
    ));
    lines.push(format!("- 作成日時: {}", format_date(server.created.as_deref())));
    lines.push(format!("- 更新日時: {}", format_date(server.updated.as_deref())));

    lines.join("\n")
}
