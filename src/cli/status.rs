// src/cli/status.rs - Health, server info, session list and usage display

use crate::client::DojoClient;
use crate::models::{CostPeriod, Session};

/// `dojo health`: round-trip latency plus the reported status.
pub async fn show_health(client: &DojoClient) -> anyhow::Result<()> {
    println!("dojo v{}", crate::client::CLIENT_VERSION);
    println!();
    println!("  Server:     {}", client.base_url());

    let check = client.test_connection().await;
    if check.success {
        println!("  Status:     ok ({} ms)", check.latency_ms);
        Ok(())
    } else {
        let reason = check.error.unwrap_or_else(|| "unknown error".into());
        println!("  Status:     unreachable ({} ms)", check.latency_ms);
        anyhow::bail!("health check failed: {reason}")
    }
}

/// `dojo info`: version, uptime, features and limits.
pub async fn show_info(client: &DojoClient) -> anyhow::Result<()> {
    let info = client.get_server_info().await?;

    println!("  Version:    {}", info.version);
    println!("  Uptime:     {}", format_duration_ms(info.uptime));
    println!("  Providers:  {}", info.providers_count);
    println!("  Sessions:   {} active", info.active_sessions);
    if info.features.is_empty() {
        println!("  Features:   (none)");
    } else {
        println!("  Features:   {}", info.features.join(", "));
    }
    println!();
    println!("  Limits:");
    println!("    Sessions:   {}", info.limits.max_sessions);
    println!("    Message:    {} chars", info.limits.max_message_length);
    println!("    File size:  {}", format_bytes(info.limits.max_file_size));
    Ok(())
}

/// `dojo sessions`: one line per session, newest first.
pub async fn show_sessions(client: &DojoClient) -> anyhow::Result<()> {
    let mut sessions = client.get_sessions().await?;
    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    for s in &sessions {
        println!("{}", session_line(s));
    }
    Ok(())
}

fn session_line(s: &Session) -> String {
    let name = s.name.as_deref().unwrap_or("(unnamed)");
    format!(
        "  {:<24} {:<28} {:>4} msgs  ${:.4}  {}/{}",
        s.id,
        crate::util::truncate_str(name, 28),
        s.message_count,
        s.total_cost,
        s.provider,
        s.model
    )
}

/// `dojo usage`: totals and per-period activity, optionally with costs.
pub async fn show_usage(client: &DojoClient, costs: Option<CostPeriod>) -> anyhow::Result<()> {
    let stats = client.get_usage_stats().await?;

    println!("  Sessions:   {}", stats.total_sessions);
    println!("  Messages:   {}", stats.total_messages);
    println!("  Cost:       ${:.4}", stats.total_cost);
    println!("  Avg reply:  {:.0} ms", stats.avg_response_time);
    if !stats.most_used_provider.is_empty() {
        println!(
            "  Top model:  {}/{}",
            stats.most_used_provider, stats.most_used_model
        );
    }
    println!();
    for (label, period) in [
        ("Today", &stats.today),
        ("Week", &stats.this_week),
        ("Month", &stats.this_month),
    ] {
        println!(
            "    {:<6} {} sessions, {} messages, ${:.4}",
            label, period.sessions, period.messages, period.cost
        );
    }

    if let Some(period) = costs {
        let breakdown = client.get_cost_breakdown(period).await?;
        println!();
        println!("  Costs ({}):", period.as_str());
        if breakdown.is_empty() {
            println!("    (no usage)");
        }
        for row in breakdown {
            println!(
                "    {:<14} {:<28} {:>6} req  ${:.4}",
                row.provider_id, row.model, row.requests, row.total_cost
            );
        }
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_duration_ms(ms: u64) -> String {
    let secs = ms / 1000;
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m {}s", mins, secs % 60)
    }
}
