use console::style;
use serde_json::Value;
use crate::cli::commands::QueryArgs;
use crate::errors::CyberHuntError;
use crate::models::comment::Comment;
use crate::models::review::Review;
use crate::utils::formatting::{format_hours, format_minor_units};
use tracing::info;

pub async fn handle_query(args: QueryArgs) -> Result<(), CyberHuntError> {
    info!(review_id = %args.review_id, server = %args.server, "Querying review");

    let token = args.token.clone().or_else(|| std::env::var("CYBERHUNT_API_TOKEN").ok());
    let client = reqwest::Client::new();
    let base = args.server.trim_end_matches('/');

    let review: Value = get_json(&client, &format!("{}/api/reviews/{}", base, args.review_id), token.as_deref()).await?;
    let comments = if args.comments {
        let body = get_json(&client, &format!("{}/api/reviews/{}/comments", base, args.review_id), token.as_deref()).await?;
        Some(body["comments"].clone())
    } else {
        None
    };

    if args.json {
        let mut output = review;
        if let Some(comments) = comments {
            output["comments"] = comments;
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let review: Review = serde_json::from_value(review)?;
    print!("{}", render_review(&review));
    if let Some(comments) = comments {
        let comments: Vec<Comment> = serde_json::from_value(comments)?;
        println!();
        println!("{} ({})", style("Comments").bold(), comments.len());
        for comment in &comments {
            let marker = if comment.is_resolved { "✓" } else { "•" };
            println!(
                "  {} [{}] {} {}: {}",
                marker,
                comment.comment_type.as_str(),
                comment.created_at.format("%Y-%m-%d %H:%M"),
                comment.author_id,
                comment.content
            );
        }
    }
    Ok(())
}

async fn get_json(client: &reqwest::Client, url: &str, token: Option<&str>) -> Result<Value, CyberHuntError> {
    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let resp = request.send().await
        .map_err(|e| CyberHuntError::Network(format!("Failed to reach server: {}", e)))?;

    let status = resp.status();
    let body: Value = resp.json().await
        .map_err(|e| CyberHuntError::Network(format!("Invalid response: {}", e)))?;

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(CyberHuntError::NotFound(body["error"].as_str().unwrap_or("not found").to_string()));
    }
    if !status.is_success() {
        return Err(CyberHuntError::Network(format!(
            "Server returned {}: {}",
            status,
            body["error"].as_str().unwrap_or("unknown error")
        )));
    }
    Ok(body)
}

/// Human-readable summary. Money is shown in major units.
pub fn render_review(review: &Review) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", style("Review").bold(), review.id));
    out.push_str(&format!("  Title:      {}\n", review.title));
    out.push_str(&format!("  Submission: {}\n", review.submission_id));
    out.push_str(&format!("  Status:     {}\n", style(review.status.as_str()).cyan()));
    out.push_str(&format!("  Priority:   {}\n", review.priority.as_str()));
    out.push_str(&format!("  Severity:   {}\n", review.severity.as_str()));
    out.push_str(&format!("  Category:   {}\n", review.category));
    if let Some(reviewer) = &review.reviewer_id {
        out.push_str(&format!("  Reviewer:   {}\n", reviewer));
    }
    if let Some(due) = review.due_date {
        out.push_str(&format!("  Due:        {}\n", due.format("%Y-%m-%d %H:%M UTC")));
    }
    if let Some(estimate) = review.estimated_reward {
        out.push_str(&format!("  Estimate:   {}\n", format_minor_units(estimate)));
    }
    if let Some(decision) = review.decision {
        out.push_str(&format!("  Decision:   {}\n", style(decision.as_str()).bold()));
        if let Some(reason) = &review.decision_reason {
            out.push_str(&format!("  Reason:     {}\n", reason));
        }
    }
    if let Some(reward) = review.actual_reward {
        out.push_str(&format!("  Reward:     {}\n", style(format_minor_units(reward)).green()));
    }
    if let (Some(started), Some(completed)) = (review.review_started, review.review_completed) {
        let hours = (completed - started).num_hours().max(0);
        out.push_str(&format!("  Took:       {}\n", format_hours(u32::try_from(hours).unwrap_or(u32::MAX))));
    }
    if !review.tags.is_empty() {
        let tags: Vec<&str> = review.tags.iter().map(String::as_str).collect();
        out.push_str(&format!("  Tags:       {}\n", tags.join(", ")));
    }
    out
}
