use serde_json::json;

use mixoff_server::config::{Round2VoterPolicy, VotingConfig};

use crate::common::{TestApp, VotingFixture, routes};

fn small_groups() -> VotingConfig {
    VotingConfig {
        target_group_size: 3,
        round1_advancers_per_group: 1,
        round2_voter_policy: Round2VoterPolicy::AllEntrants,
    }
}

/// Cast every entrant's Round-1 ballot, ranking the judged slate in order.
async fn vote_all(app: &TestApp, fx: &VotingFixture) {
    for (i, entrant) in fx.entrants.iter().enumerate() {
        let judged = (i / 3 + 1) % 3 + 1;
        let [a, b, c] = fx.group_submissions(judged);
        let res = app
            .cast_round1(fx.competition_id, &entrant.token, a, b, c)
            .await;
        assert_eq!(res.status, 200, "entrant {i}: {}", res.text);
    }
}

#[tokio::test]
async fn dashboard_and_results_degrade_gracefully_before_voting() {
    let app = TestApp::spawn().await;
    let org = app
        .create_user_with_role("deg_org", "password123", "organizer")
        .await;
    let id = app.create_competition(&org, "Quiet mixoff").await;

    let res = app.get_with_token(&routes::dashboard(id), &org).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "upcoming");
    assert_eq!(res.body["submissions"], 0);
    assert_eq!(res.body["group_count"], 0);
    assert_eq!(res.body["voters_total"], 0);
    assert_eq!(res.body["completion_percent"], 0.0);
    assert!(res.body["groups"].as_array().unwrap().is_empty());
    assert!(res.body["recent_voters"].as_array().unwrap().is_empty());

    let res = app.get_with_token(&routes::results(id), &org).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body["group_standings"].as_array().unwrap().is_empty());
    assert!(res.body["finalists"].as_array().unwrap().is_empty());
    assert!(res.body["winner"].is_null());
    assert!(res.body["song_creator_picks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn dashboard_tracks_round1_progress() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "dash", 9).await;

    // two of nine voters have completed their ballot
    for i in [0, 3] {
        let judged = (i / 3 + 1) % 3 + 1;
        let [a, b, c] = fx.group_submissions(judged);
        let res = app
            .cast_round1(fx.competition_id, &fx.entrants[i].token, a, b, c)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    let res = app
        .get_with_token(&routes::dashboard(fx.competition_id), &fx.organizer)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "voting_round1_open");
    assert_eq!(res.body["submissions"], 9);
    assert_eq!(res.body["disqualified"], 0);
    assert_eq!(res.body["group_count"], 3);
    assert_eq!(res.body["voters_total"], 9);
    assert_eq!(res.body["voters_completed"], 2);
    assert_eq!(res.body["completion_percent"], 22.22);

    let groups = res.body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 3);
    for group in groups {
        assert_eq!(group["submissions"], 3);
        assert_eq!(group["voters_assigned"], 3);
    }
    // entrant 0 judges group 2, entrant 3 judges group 3
    assert_eq!(groups[0]["voters_completed"], 0);
    assert_eq!(groups[1]["voters_completed"], 1);
    assert_eq!(groups[2]["voters_completed"], 1);

    let recent: Vec<&str> = res.body["recent_voters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["username"].as_str().unwrap())
        .collect();
    assert_eq!(recent.len(), 2);
    assert!(recent.contains(&"dash_entrant0"));
    assert!(recent.contains(&"dash_entrant3"));
}

#[tokio::test]
async fn completed_competitions_expose_full_standings() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "res", 9).await;
    vote_all(&app, &fx).await;

    app.advance_to(fx.competition_id, &fx.organizer, "voting_round1_tallying")
        .await;
    app.advance_to(fx.competition_id, &fx.organizer, "voting_round2_setup")
        .await;
    app.advance_to(fx.competition_id, &fx.organizer, "voting_round2_open")
        .await;

    let f0 = fx.entrants[0].submission_id;
    let f3 = fx.entrants[3].submission_id;
    let f6 = fx.entrants[6].submission_id;
    for i in [1, 2, 4, 5, 7, 8] {
        let res = app
            .cast_round2(fx.competition_id, &fx.entrants[i].token, f0, f3, f6)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
    app.advance_to(fx.competition_id, &fx.organizer, "completed")
        .await;

    let res = app
        .put_with_token(
            &routes::song_creator_picks(fx.competition_id),
            &json!({"picks": [{"submission_id": f3, "comment": "Personal favourite"}]}),
            &fx.organizer,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app
        .get_with_token(&routes::results(fx.competition_id), &fx.entrants[1].token)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "completed");

    let standings = res.body["group_standings"].as_array().unwrap();
    assert_eq!(standings.len(), 3);
    let group1 = &standings[0];
    assert_eq!(group1["group_number"], 1);
    let entries = group1["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    for (index, (points, firsts)) in [(9, 3), (6, 0), (3, 0)].iter().enumerate() {
        assert_eq!(entries[index]["rank_in_group"], index as i32 + 1);
        assert_eq!(entries[index]["total_points"], *points);
        assert_eq!(entries[index]["first_place_votes"], *firsts);
        assert_eq!(entries[index]["advanced_to_round2"], index == 0);
        assert_eq!(entries[index]["is_disqualified"], false);
    }
    assert_eq!(entries[0]["submission_id"], f0);
    assert_eq!(entries[0]["username"], "res_entrant0");

    let finalists = res.body["finalists"].as_array().unwrap();
    assert_eq!(finalists.len(), 3);
    let scores: Vec<(i64, i64)> = finalists
        .iter()
        .map(|f| {
            (
                f["submission_id"].as_i64().unwrap(),
                f["final_score"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        scores,
        vec![(f0 as i64, 18), (f3 as i64, 12), (f6 as i64, 6)]
    );

    assert_eq!(res.body["winner"]["submission_id"], f0);
    assert_eq!(res.body["winner"]["username"], "res_entrant0");

    let picks = res.body["song_creator_picks"].as_array().unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0]["rank"], 1);
    assert_eq!(picks[0]["submission_id"], f3);
    assert_eq!(picks[0]["comment"], "Personal favourite");
}

#[tokio::test]
async fn disqualified_entries_sink_to_the_bottom_of_their_group() {
    let app = TestApp::spawn_with_voting(small_groups()).await;
    let fx = VotingFixture::round1_open(&app, "dqres", 9).await;

    // entrant 8 skips their judging duty
    for (i, entrant) in fx.entrants.iter().enumerate().take(8) {
        let judged = (i / 3 + 1) % 3 + 1;
        let [a, b, c] = fx.group_submissions(judged);
        let res = app
            .cast_round1(fx.competition_id, &entrant.token, a, b, c)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
    app.advance_to(fx.competition_id, &fx.organizer, "voting_round1_tallying")
        .await;

    let res = app
        .get_with_token(&routes::results(fx.competition_id), &fx.organizer)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let standings = res.body["group_standings"].as_array().unwrap();
    let group3 = &standings[2];
    assert_eq!(group3["group_number"], 3);
    let entries = group3["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);

    // the disqualified entry keeps its vote counts but holds no rank and
    // sorts after the ranked entries
    let last = &entries[2];
    assert_eq!(last["submission_id"], fx.entrants[8].submission_id);
    assert_eq!(last["is_disqualified"], true);
    assert!(last["rank_in_group"].is_null());
    assert_eq!(last["total_points"], 3);
    assert_eq!(last["advanced_to_round2"], false);
}
