use chrono::{DateTime, Duration, Utc};
use polling::polls::{
    BallotRequest, CreatePollRequest, PollService, PollServiceError, PollStore, PollType,
    PollView,
};
use tracing::{info, warn};

const DEMO_USERS: [(&str, &str); 8] = [
    ("admin@example.com", "admin123"),
    ("john@email.com", "password123"),
    ("sarah@email.com", "password123"),
    ("mike@email.com", "password123"),
    ("emma@email.com", "password123"),
    ("alex@email.com", "password123"),
    ("lisa@email.com", "password123"),
    ("david@email.com", "password123"),
];

const DEMO_EXPIRY_DAYS: i64 = 30;

struct DemoPoll {
    title: &'static str,
    description: &'static str,
    poll_type: PollType,
    max_votes: i64,
    options: &'static [&'static str],
    /// Share of voters leaning toward each option, in option order.
    leaning: &'static [f64],
}

const DEMO_POLLS: [DemoPoll; 6] = [
    DemoPoll {
        title: "Favorite Programming Language",
        description: "What's your go-to language for backend development?",
        poll_type: PollType::SingleChoice,
        max_votes: 1,
        options: &["Go", "Python", "Node.js", "Java", "C#", "Rust"],
        leaning: &[0.35, 0.25, 0.20, 0.10, 0.05, 0.05],
    },
    DemoPoll {
        title: "Preferred Pizza Toppings",
        description: "Which toppings do you love? (Choose up to 3)",
        poll_type: PollType::MultipleChoice,
        max_votes: 3,
        options: &[
            "Pepperoni",
            "Mushrooms",
            "Bell Peppers",
            "Olives",
            "Pineapple",
            "Sausage",
        ],
        leaning: &[0.20, 0.18, 0.15, 0.12, 0.10, 0.25],
    },
    DemoPoll {
        title: "Best Development IDE",
        description: "Which IDE/editor do you use most?",
        poll_type: PollType::SingleChoice,
        max_votes: 1,
        options: &["VS Code", "IntelliJ IDEA", "Vim/Neovim", "Sublime Text", "Atom"],
        leaning: &[0.45, 0.25, 0.15, 0.10, 0.05],
    },
    DemoPoll {
        title: "Favorite Movie Genres",
        description: "What genres do you enjoy? (Select multiple)",
        poll_type: PollType::MultipleChoice,
        max_votes: 4,
        options: &[
            "Action",
            "Comedy",
            "Drama",
            "Sci-Fi",
            "Horror",
            "Romance",
            "Documentary",
        ],
        leaning: &[0.18, 0.22, 0.15, 0.20, 0.08, 0.12, 0.05],
    },
    DemoPoll {
        title: "Remote Work Preference",
        description: "How do you prefer to work?",
        poll_type: PollType::SingleChoice,
        max_votes: 1,
        options: &[
            "Fully Remote",
            "Hybrid (2-3 days office)",
            "Mostly Office",
            "Flexible",
        ],
        leaning: &[0.40, 0.35, 0.15, 0.10],
    },
    DemoPoll {
        title: "Favorite Social Media Platform",
        description: "Which platform do you use most?",
        poll_type: PollType::SingleChoice,
        max_votes: 1,
        options: &["Twitter/X", "LinkedIn", "Instagram", "TikTok", "Reddit", "YouTube"],
        leaning: &[0.15, 0.20, 0.18, 0.12, 0.25, 0.10],
    },
];

/// What a seeding run created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    pub(crate) users: usize,
    pub(crate) polls: Vec<PollView>,
    pub(crate) votes: usize,
}

/// Populate an empty store with demo users, polls and votes.
///
/// Returns `None` without touching the store when any user already exists. Votes go through
/// the regular ballot path, so seeded counts always match the vote records.
pub(crate) fn seed_demo_data<S>(
    service: &PollService<S>,
    now: DateTime<Utc>,
) -> Result<Option<SeedSummary>, PollServiceError>
where
    S: PollStore + 'static,
{
    if service.has_users()? {
        info!("store already has users, skipping demo seed");
        return Ok(None);
    }

    for (email, password) in DEMO_USERS {
        service.register_user(email, password)?;
    }
    info!(users = DEMO_USERS.len(), "demo users created");

    let expires_at = (now + Duration::days(DEMO_EXPIRY_DAYS)).to_rfc3339();
    let mut polls = Vec::with_capacity(DEMO_POLLS.len());
    let mut votes = 0;

    for (poll_index, demo) in DEMO_POLLS.iter().enumerate() {
        let created = service.create_poll_at(
            CreatePollRequest {
                title: demo.title.to_string(),
                description: Some(demo.description.to_string()),
                poll_type: Some(demo.poll_type.label().to_string()),
                created_by: Some(DEMO_USERS[0].0.to_string()),
                max_votes_per_user: Some(demo.max_votes),
                expires_at: Some(expires_at.clone()),
                options: demo.options.iter().map(|text| text.to_string()).collect(),
            },
            now,
        )?;

        for (user_index, (email, _)) in DEMO_USERS.iter().enumerate() {
            let picks = demo_picks(demo, poll_index, user_index);
            if picks.is_empty() {
                continue;
            }

            let ballot = BallotRequest {
                poll_id: created.poll.id,
                option_ids: picks
                    .iter()
                    .map(|&index| created.options[index].id)
                    .collect(),
                voter_identifier: email.to_string(),
            };
            match service.submit_vote_at(ballot, now) {
                Ok(receipt) => votes += receipt.votes.len(),
                Err(PollServiceError::Admission(reason)) => {
                    warn!(poll_id = %created.poll.id, %reason, "demo ballot rejected");
                }
                Err(other) => return Err(other),
            }
        }

        let refreshed = service.get_poll(created.poll.id)?;
        info!(
            poll_id = %refreshed.poll.id,
            total_votes = refreshed.total_votes,
            "demo poll seeded"
        );
        polls.push(refreshed);
    }

    info!(polls = polls.len(), votes, "demo seed complete");
    Ok(Some(SeedSummary {
        users: DEMO_USERS.len(),
        polls,
        votes,
    }))
}

/// Deterministic option indexes a demo user picks on a demo poll; empty means abstain.
fn demo_picks(demo: &DemoPoll, poll_index: usize, user_index: usize) -> Vec<usize> {
    if (user_index * 3 + poll_index) % 7 == 0 {
        return Vec::new();
    }

    let wanted = match demo.poll_type {
        PollType::SingleChoice => 1,
        PollType::MultipleChoice => {
            let allowance = usize::try_from(demo.max_votes).unwrap_or(1).max(1);
            1 + (user_index + poll_index) % allowance
        }
    };

    let mut picks: Vec<usize> = Vec::with_capacity(wanted);
    for draw in 0..wanted {
        let point = ((user_index * 37 + poll_index * 11 + draw * 53) % 100) as f64 / 100.0;
        let index = lean_toward(demo.leaning, point);
        if !picks.contains(&index) {
            picks.push(index);
        }
    }
    picks
}

fn lean_toward(leaning: &[f64], point: f64) -> usize {
    let mut cumulative = 0.0;
    for (index, share) in leaning.iter().enumerate() {
        cumulative += share;
        if point < cumulative {
            return index;
        }
    }
    leaning.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use polling::polls::{InMemoryPollStore, VoteFilter};
    use std::sync::Arc;

    fn seed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn seeds_once_and_keeps_counts_consistent() {
        let store = Arc::new(InMemoryPollStore::new());
        let service = PollService::new(store.clone());

        let summary = seed_demo_data(&service, seed_time())
            .expect("seed runs")
            .expect("empty store is seeded");
        assert_eq!(summary.users, 8);
        assert_eq!(summary.polls.len(), 6);
        assert!(summary.votes > 0);

        let mut recorded = 0;
        for view in &summary.polls {
            assert_eq!(
                view.poll.expires_at,
                Some(seed_time() + Duration::days(DEMO_EXPIRY_DAYS))
            );
            let votes = store
                .list_votes(&VoteFilter::poll(view.poll.id))
                .expect("votes listed");
            recorded += votes.len();
            for option in &view.options {
                let actual = votes
                    .iter()
                    .filter(|vote| vote.option_id == option.id)
                    .count() as u64;
                assert_eq!(option.vote_count, actual, "option {}", option.option_text);
            }
        }
        assert_eq!(recorded, summary.votes);

        assert_eq!(seed_demo_data(&service, seed_time()).expect("seed runs"), None);
        assert_eq!(service.list_polls().expect("polls listed").len(), 6);
    }

    #[test]
    fn demo_picks_stay_within_allowance() {
        for (poll_index, demo) in DEMO_POLLS.iter().enumerate() {
            assert_eq!(demo.options.len(), demo.leaning.len(), "{}", demo.title);
            for user_index in 0..DEMO_USERS.len() {
                let picks = demo_picks(demo, poll_index, user_index);
                assert!(picks.len() as i64 <= demo.max_votes);
                assert!(picks.iter().all(|&index| index < demo.options.len()));
            }
        }
    }

    #[test]
    fn seeded_admin_can_log_in() {
        let service = PollService::new(Arc::new(InMemoryPollStore::new()));
        seed_demo_data(&service, seed_time()).expect("seed runs");

        let user = service
            .login(polling::polls::LoginRequest {
                email: "admin@example.com".to_string(),
                password: "admin123".to_string(),
            })
            .expect("seeded credentials accepted");
        assert_eq!(user.email, "admin@example.com");
    }
}
