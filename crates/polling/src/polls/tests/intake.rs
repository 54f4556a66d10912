use super::common::*;
use chrono::Duration;

use crate::polls::domain::{OptionId, PollId, PollType};
use crate::polls::intake::{check_ballot, new_poll_from_request, CreatePollRequest, ValidationError};

#[test]
fn single_choice_defaults_are_filled_in() {
    let request = CreatePollRequest {
        title: "  Best Time for Team Meetings ".to_string(),
        options: vec![
            "Morning".to_string(),
            "  ".to_string(),
            "Afternoon ".to_string(),
        ],
        max_votes_per_user: Some(4),
        ..CreatePollRequest::default()
    };

    let poll = new_poll_from_request(request, now()).expect("valid poll");
    assert_eq!(poll.title, "Best Time for Team Meetings");
    assert_eq!(poll.poll_type, PollType::SingleChoice);
    assert_eq!(poll.created_by, "anonymous");
    assert_eq!(poll.max_votes_per_user, 1);
    assert_eq!(poll.options, vec!["Morning", "Afternoon"]);
    assert!(poll.description.is_none());
    assert!(poll.expires_at.is_none());
}

#[test]
fn blank_title_and_short_option_lists_are_rejected() {
    let mut request = single_choice_request(&["A", "B"]);
    request.title = "   ".to_string();
    assert_eq!(
        new_poll_from_request(request, now()),
        Err(ValidationError::EmptyTitle)
    );

    let request = single_choice_request(&["Only", " "]);
    assert_eq!(
        new_poll_from_request(request, now()),
        Err(ValidationError::TooFewOptions)
    );
}

#[test]
fn unknown_poll_type_is_rejected() {
    let mut request = single_choice_request(&["A", "B"]);
    request.poll_type = Some("ranked".to_string());
    assert_eq!(
        new_poll_from_request(request, now()),
        Err(ValidationError::InvalidPollType)
    );
}

#[test]
fn multiple_choice_requires_positive_allowance() {
    let accepted =
        new_poll_from_request(multiple_choice_request(2, &["A", "B", "C"]), now()).expect("valid");
    assert_eq!(accepted.poll_type, PollType::MultipleChoice);
    assert_eq!(accepted.max_votes_per_user, 2);

    for max in [Some(0), Some(-3), None] {
        let mut request = multiple_choice_request(1, &["A", "B"]);
        request.max_votes_per_user = max;
        assert_eq!(
            new_poll_from_request(request, now()),
            Err(ValidationError::InvalidMaxVotes),
            "max_votes_per_user {max:?}"
        );
    }
}

#[test]
fn expiry_must_parse_and_lie_ahead() {
    let mut request = single_choice_request(&["A", "B"]);
    request.expires_at = Some("next tuesday".to_string());
    assert_eq!(
        new_poll_from_request(request, now()),
        Err(ValidationError::MalformedExpiry)
    );

    let mut request = single_choice_request(&["A", "B"]);
    request.expires_at = Some((now() - Duration::minutes(1)).to_rfc3339());
    assert_eq!(
        new_poll_from_request(request, now()),
        Err(ValidationError::ExpiryInPast)
    );

    let deadline = now() + Duration::days(7);
    let mut request = single_choice_request(&["A", "B"]);
    request.expires_at = Some(deadline.to_rfc3339());
    let poll = new_poll_from_request(request, now()).expect("valid poll");
    assert_eq!(poll.expires_at, Some(deadline));
}

#[test]
fn ballot_shape_checks_run_in_order() {
    assert_eq!(
        check_ballot(&ballot(PollId(0), "", &[])),
        Err(ValidationError::MissingPollId)
    );
    assert_eq!(
        check_ballot(&ballot(PollId(3), "", &[])),
        Err(ValidationError::NoOptionsSelected)
    );
    assert_eq!(
        check_ballot(&ballot(PollId(3), " ", &[OptionId(1)])),
        Err(ValidationError::MissingVoter)
    );
    assert_eq!(
        check_ballot(&ballot(PollId(3), "x@example.com", &[OptionId(1)])),
        Ok(())
    );
}
