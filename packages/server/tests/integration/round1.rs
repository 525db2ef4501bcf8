use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use mixoff_server::config::{Round2VoterPolicy, VotingConfig};
use mixoff_server::entity::{round_assignment, submission, submission_group};

use crate::common::{TestApp, VotingFixture, routes};

fn small_groups() -> VotingConfig {
    VotingConfig {
        target_group_size: 3,
        round1_advancers_per_group: 1,
        round2_voter_policy: Round2VoterPolicy::AllEntrants,
    }
}

/// Have every entrant cast a ballot ranking their judged group's members in
/// slate order, so group `g`'s first member always scores 3 firsts (9 pts).
async fn vote_all(app: &TestApp, fx: &VotingFixture) {
    for (i, entrant) in fx.entrants.iter().enumerate() {
        let own_group = i / 3 + 1;
        let judged = own_group % 3 + 1;
        let [a, b, c] = fx.group_submissions(judged);
        let res = app
            .cast_round1(fx.competition_id, &entrant.token, a, b, c)
            .await;
        assert_eq!(res.status, 200, "entrant {i} ballot failed: {}", res.text);
        assert_eq!(res.body["accepted"], true);
    }
}

#[tokio::test]
async fn advancing_past_submissions_creates_balanced_groups_and_assignments() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "grp", 9).await;

    let group_rows = submission_group::Entity::find()
        .filter(submission_group::Column::CompetitionId.eq(fx.competition_id))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(group_rows.len(), 9);

    let mut sizes: HashMap<i32, usize> = HashMap::new();
    for row in &group_rows {
        *sizes.entry(row.group_number).or_default() += 1;
    }
    assert_eq!(sizes.len(), 3);
    assert!(sizes.values().all(|&n| n == 3), "uneven groups: {sizes:?}");

    let assignments = round_assignment::Entity::find()
        .filter(round_assignment::Column::CompetitionId.eq(fx.competition_id))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(assignments.len(), 9);

    // nobody judges their own group, and every group is judged by exactly
    // one other group's worth of voters
    let mut judges_per_group: HashMap<i32, usize> = HashMap::new();
    for a in &assignments {
        assert_ne!(a.voter_group_number, a.assigned_group_number);
        assert!(!a.has_voted);
        *judges_per_group.entry(a.assigned_group_number).or_default() += 1;
    }
    assert!(judges_per_group.values().all(|&n| n == 3));
}

#[tokio::test]
async fn assignment_endpoint_returns_the_judged_slate() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "slate", 9).await;

    // entrant 0 is in group 1, which judges group 2 (entrants 3..6)
    let res = app
        .get_with_token(
            &routes::assignment(fx.competition_id),
            &fx.entrants[0].token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["voter_group_number"], 1);
    assert_eq!(res.body["assigned_group_number"], 2);
    assert_eq!(res.body["has_voted"], false);

    let slate: Vec<i32> = res.body["submissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["submission_id"].as_i64().unwrap() as i32)
        .collect();
    assert_eq!(slate, fx.group_submissions(2).to_vec());

    // outsiders have no assignment
    let outsider = app
        .create_authenticated_user("slate_outsider", "password123")
        .await;
    let res = app
        .get_with_token(&routes::assignment(fx.competition_id), &outsider)
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn ballots_are_validated_against_the_assigned_group() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "val", 9).await;

    let voter = &fx.entrants[0].token; // judges group 2
    let [a, b, c] = fx.group_submissions(2);
    let [own, own2, _] = fx.group_submissions(1);

    // duplicate places
    let res = app.cast_round1(fx.competition_id, voter, a, a, b).await;
    assert_eq!(res.status, 422, "{}", res.text);
    assert_eq!(res.body["accepted"], false);

    // a submission outside the assigned group
    let res = app.cast_round1(fx.competition_id, voter, a, b, own2).await;
    assert_eq!(res.status, 422);
    assert_eq!(res.body["accepted"], false);

    // the voter's own entry is never votable
    let res = app.cast_round1(fx.competition_id, voter, a, b, own).await;
    assert_eq!(res.status, 422);

    // a submission that does not exist
    let res = app
        .cast_round1(fx.competition_id, voter, a, b, 9_999_999)
        .await;
    assert_eq!(res.status, 422);

    // nothing was recorded by the rejected ballots
    let res = app
        .get_with_token(&routes::assignment(fx.competition_id), voter)
        .await;
    assert_eq!(res.body["has_voted"], false);

    // a valid ballot is accepted exactly once
    let res = app.cast_round1(fx.competition_id, voter, a, b, c).await;
    assert_eq!(res.status, 200, "{}", res.text);
    let res = app.cast_round1(fx.competition_id, voter, c, b, a).await;
    assert_eq!(res.status, 422);
    assert_eq!(res.body["accepted"], false);

    // voters without an assignment are rejected, not errored
    let outsider = app
        .create_authenticated_user("val_outsider", "password123")
        .await;
    let res = app.cast_round1(fx.competition_id, &outsider, a, b, c).await;
    assert_eq!(res.status, 422);
}

#[tokio::test]
async fn single_group_competitions_reject_only_self_votes() {
    // 5 entrants under the default target of 20 form one group that
    // judges itself
    let app = TestApp::spawn().await;
    let fx = VotingFixture::round1_open(&app, "solo", 5).await;

    let ids: Vec<i32> = fx.entrants.iter().map(|e| e.submission_id).collect();

    let res = app
        .get_with_token(
            &routes::assignment(fx.competition_id),
            &fx.entrants[0].token,
        )
        .await;
    assert_eq!(res.body["voter_group_number"], 1);
    assert_eq!(res.body["assigned_group_number"], 1);

    // a ballot containing the voter's own entry is rejected
    let res = app
        .cast_round1(fx.competition_id, &fx.entrants[0].token, ids[0], ids[1], ids[2])
        .await;
    assert_eq!(res.status, 422);

    // a ballot over three peers is fine
    let res = app
        .cast_round1(fx.competition_id, &fx.entrants[0].token, ids[1], ids[2], ids[3])
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
}

#[tokio::test]
async fn full_round1_flow_tallies_and_advances_group_winners() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "tally", 9).await;

    vote_all(&app, &fx).await;

    // the transition runs disqualification and the tally in one step
    app.advance_to(fx.competition_id, &fx.organizer, "voting_round1_tallying")
        .await;

    // everyone voted, so the rerunnable endpoints are no-ops
    let res = app
        .post_with_token(
            &routes::round1_disqualify(fx.competition_id),
            &json!({}),
            &fx.organizer,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["disqualified"], 0);

    let res = app
        .post_with_token(
            &routes::round1_tally(fx.competition_id),
            &json!({}),
            &fx.organizer,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["advanced"], 3);

    // each group's slate-first member got 3 firsts = 9 points and advanced
    let submissions = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(fx.competition_id))
        .all(&app.db)
        .await
        .unwrap();
    for (i, entrant) in fx.entrants.iter().enumerate() {
        let model = submissions
            .iter()
            .find(|s| s.id == entrant.submission_id)
            .unwrap();
        let expected_score = [9, 6, 3][i % 3];
        assert_eq!(model.round1_score, Some(expected_score), "entrant {i}");
        assert_eq!(model.advanced_to_round2, i % 3 == 0, "entrant {i}");
        assert!(!model.is_disqualified);
    }

    let group_rows = submission_group::Entity::find()
        .filter(submission_group::Column::CompetitionId.eq(fx.competition_id))
        .all(&app.db)
        .await
        .unwrap();
    for row in &group_rows {
        assert_eq!(row.total_points, [9, 6, 3][(row.rank_in_group.unwrap() - 1) as usize]);
    }
}

#[tokio::test]
async fn non_voters_forfeit_their_own_entry() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "dq", 9).await;

    // everyone votes except entrant 8 (group 3, judge of group 1)
    for (i, entrant) in fx.entrants.iter().enumerate().take(8) {
        let judged = (i / 3 + 1) % 3 + 1;
        let [a, b, c] = fx.group_submissions(judged);
        let res = app
            .cast_round1(fx.competition_id, &entrant.token, a, b, c)
            .await;
        assert_eq!(res.status, 200, "entrant {i}: {}", res.text);
    }

    app.advance_to(fx.competition_id, &fx.organizer, "voting_round1_tallying")
        .await;

    let slacker = submission::Entity::find_by_id(fx.entrants[8].submission_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert!(slacker.is_disqualified);
    assert!(!slacker.advanced_to_round2);
    assert_eq!(slacker.round1_score, None);

    // the votes cast FOR the disqualified entry remain on the cached row,
    // but it holds no rank
    let row = submission_group::Entity::find()
        .filter(submission_group::Column::SubmissionId.eq(slacker.id))
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.total_points, 3); // ranked 3rd by each of 3 voters
    assert_eq!(row.rank_in_group, None);

    // the group the non-voter neglected is unaffected: its top entry
    // still advanced
    let neglected_top = submission::Entity::find_by_id(fx.entrants[0].submission_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert!(neglected_top.advanced_to_round2);
    assert!(!neglected_top.is_disqualified);
}

#[tokio::test]
async fn voting_outside_the_open_phase_is_an_invalid_state() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "phase", 9).await;

    vote_all(&app, &fx).await;
    app.advance_to(fx.competition_id, &fx.organizer, "voting_round1_tallying")
        .await;

    let [a, b, c] = fx.group_submissions(2);
    let res = app
        .cast_round1(fx.competition_id, &fx.entrants[0].token, a, b, c)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "INVALID_STATE");
}

#[tokio::test]
async fn explicit_group_creation_respects_a_custom_target_size() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let org = app
        .create_user_with_role("cgrp_org", "password123", "organizer")
        .await;
    let id = app.create_competition(&org, "Custom groups").await;
    app.advance_to(id, &org, "open_for_submissions").await;

    for i in 0..9 {
        let token = app
            .create_authenticated_user(&format!("cgrp_entrant{i}"), "password123")
            .await;
        app.create_submission(id, &token, &format!("custom mix {i}"))
            .await;
    }

    let res = app
        .post_with_token(&routes::groups(id), &json!({"target_group_size": 5}), &org)
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["group_count"], 2);

    // creating twice is a conflict
    let res = app.post_with_token(&routes::groups(id), &json!({}), &org).await;
    assert_eq!(res.status, 409);
    assert_eq!(res.error_code(), "CONFLICT");

    // advancing keeps the pre-created partition instead of rebuilding it
    app.advance_to(id, &org, "voting_round1_setup").await;
    let group_rows = submission_group::Entity::find()
        .filter(submission_group::Column::CompetitionId.eq(id))
        .all(&app.db)
        .await
        .unwrap();
    let max_group = group_rows.iter().map(|r| r.group_number).max().unwrap();
    assert_eq!(max_group, 2);
}
