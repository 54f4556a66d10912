use crate::seed::seed_demo_data;
use chrono::Utc;
use clap::Args;
use polling::error::AppError;
use polling::polls::{
    BallotRequest, CreatePollRequest, InMemoryPollStore, OptionId, PollService, PollView,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the final poll listing as JSON instead of tallies.
    #[arg(long)]
    pub(crate) json: bool,
    /// Skip the seeded demo data and only replay the voting scenarios.
    #[arg(long)]
    pub(crate) skip_seed: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { json, skip_seed } = args;
    let service = PollService::new(Arc::new(InMemoryPollStore::new()));
    let now = Utc::now();

    println!("Polling service demo");
    if !skip_seed {
        if let Some(summary) = seed_demo_data(&service, now)? {
            println!(
                "- Seeded {} users, {} polls and {} votes",
                summary.users,
                summary.polls.len(),
                summary.votes
            );
        }
    }

    println!("\nVoting scenarios");
    replay_single_choice(&service)?;
    replay_multiple_choice(&service)?;
    replay_foreign_option(&service)?;

    let polls = service.list_polls()?;
    if json {
        match serde_json::to_string_pretty(&polls) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Poll listing unavailable: {err}"),
        }
        return Ok(());
    }

    println!("\nTallies");
    for view in &polls {
        render_tally(view);
    }

    Ok(())
}

fn scenario_poll(
    service: &PollService<InMemoryPollStore>,
    title: &str,
    poll_type: &str,
    max_votes: Option<i64>,
    options: &[&str],
) -> Result<PollView, AppError> {
    Ok(service.create_poll(CreatePollRequest {
        title: title.to_string(),
        poll_type: Some(poll_type.to_string()),
        max_votes_per_user: max_votes,
        options: options.iter().map(|text| text.to_string()).collect(),
        ..CreatePollRequest::default()
    })?)
}

fn cast(
    service: &PollService<InMemoryPollStore>,
    view: &PollView,
    voter: &str,
    option_ids: &[OptionId],
) {
    let ballot = BallotRequest {
        poll_id: view.poll.id,
        option_ids: option_ids.to_vec(),
        voter_identifier: voter.to_string(),
    };
    let labels: Vec<&str> = option_ids
        .iter()
        .filter_map(|id| view.options.iter().find(|option| option.id == *id))
        .map(|option| option.option_text.as_str())
        .collect();

    match service.submit_vote(ballot) {
        Ok(receipt) => println!(
            "  {voter} -> [{}]: admitted {} vote(s), poll total {}",
            labels.join(", "),
            receipt.votes.len(),
            receipt.poll.total_votes
        ),
        Err(err) => println!("  {voter} -> [{}]: rejected ({err})", labels.join(", ")),
    }
}

fn replay_single_choice(service: &PollService<InMemoryPollStore>) -> Result<(), AppError> {
    let view = scenario_poll(
        service,
        "Coffee or Tea",
        "single_choice",
        None,
        &["Coffee", "Tea"],
    )?;
    println!("- Single choice: one ballot per voter");
    cast(service, &view, "x@example.com", &[view.options[0].id]);
    cast(service, &view, "x@example.com", &[view.options[1].id]);
    Ok(())
}

fn replay_multiple_choice(service: &PollService<InMemoryPollStore>) -> Result<(), AppError> {
    let view = scenario_poll(
        service,
        "Weekend Activities",
        "multiple_choice",
        Some(2),
        &["Hiking", "Cinema", "Board Games"],
    )?;
    println!("- Multiple choice: allowance of 2 across ballots");
    cast(
        service,
        &view,
        "x@example.com",
        &[view.options[0].id, view.options[1].id],
    );
    cast(service, &view, "x@example.com", &[view.options[2].id]);
    cast(service, &view, "y@example.com", &[view.options[2].id, view.options[2].id]);
    Ok(())
}

fn replay_foreign_option(service: &PollService<InMemoryPollStore>) -> Result<(), AppError> {
    let first = scenario_poll(
        service,
        "Standup Time",
        "multiple_choice",
        Some(2),
        &["09:00", "10:00"],
    )?;
    let second = scenario_poll(
        service,
        "Retro Format",
        "single_choice",
        None,
        &["Start/Stop/Continue", "Sailboat"],
    )?;
    println!("- Ballots naming another poll's option are refused whole");
    let ballot = BallotRequest {
        poll_id: first.poll.id,
        option_ids: vec![first.options[0].id, second.options[0].id],
        voter_identifier: "x@example.com".to_string(),
    };
    match service.submit_vote(ballot) {
        Ok(receipt) => println!("  unexpectedly admitted {} vote(s)", receipt.votes.len()),
        Err(err) => println!("  rejected ({err})"),
    }
    let after = service.get_poll(first.poll.id)?;
    println!("  poll total after rejection: {}", after.total_votes);
    Ok(())
}

fn render_tally(view: &PollView) {
    println!(
        "- {} [{}] total {}",
        view.poll.title,
        view.poll.poll_type.label(),
        view.total_votes
    );
    for (option, share) in view.shares() {
        println!(
            "    {:<28} {:>3} ({:>5.1}%)",
            option.option_text, option.vote_count, share
        );
    }
}
