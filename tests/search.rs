use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use uttt_bot::eval::position_score;
use uttt_bot::game::META_SIZE;
use uttt_bot::{Heuristic, MetaBoard, MetaMove, PlayerMarker, SearchConfig, Searcher, Sector, Sectors};

const AMPLE: Duration = Duration::from_secs(60);

fn mv(meta_index: usize, board_index: usize) -> MetaMove {
    MetaMove { meta_index, board_index }
}

fn board_with(marks: &[(usize, usize, PlayerMarker)], playable: Sectors) -> MetaBoard {
    let mut field = [0u8; META_SIZE];
    for &(meta_index, board_index, player) in marks {
        field[mv(meta_index, board_index).field_index()] = player.code();
    }
    MetaBoard::new(&field, playable).unwrap()
}

fn exact_searcher() -> Searcher {
    Searcher::new(Heuristic::exact(), ChaCha20Rng::seed_from_u64(0))
}

/// `player` owns the top row of sub-boards 0 and 1 and two cells of
/// sub-board 2, where the next move is forced.
fn one_move_from_macro_win(player: PlayerMarker) -> MetaBoard {
    let other = player.to_other();
    board_with(
        &[
            (0, 0, player),
            (0, 1, player),
            (0, 2, player),
            (0, 4, other),
            (1, 0, player),
            (1, 1, player),
            (1, 2, player),
            (1, 4, other),
            (2, 0, player),
            (2, 1, player),
            (2, 3, other),
            (4, 2, other),
        ],
        Sector::TopRight.into(),
    )
}

#[test]
fn x_takes_the_macro_win() {
    let mut board = one_move_from_macro_win(PlayerMarker::X);
    let outcome = exact_searcher()
        .best_move(&mut board, PlayerMarker::X, 3, AMPLE)
        .unwrap();
    assert_eq!(outcome.mv, mv(2, 2));
    assert_eq!(outcome.score, 1.);
    assert!(outcome.terminal);
}

#[test]
fn o_takes_the_macro_win() {
    let mut board = one_move_from_macro_win(PlayerMarker::O);
    let outcome = exact_searcher()
        .best_move(&mut board, PlayerMarker::O, 3, AMPLE)
        .unwrap();
    assert_eq!(outcome.mv, mv(2, 2));
    assert_eq!(outcome.score, -1.);
    assert!(outcome.terminal);
}

#[test]
fn single_legal_move_returns_its_direct_evaluation() {
    use PlayerMarker::{O, X};
    // X O X
    // X O O
    // O X .
    let pattern = [X, O, X, X, O, O, O, X];
    let marks: Vec<_> = pattern
        .iter()
        .enumerate()
        .map(|(board_index, &player)| (4, board_index, player))
        .collect();

    for depth in [0, 1, 5] {
        let mut board = board_with(&marks, Sector::Center.into());
        assert_eq!(board.allowed_moves().as_slice(), &[mv(4, 8)]);

        let outcome = exact_searcher()
            .best_move(&mut board, X, depth, AMPLE)
            .unwrap();
        assert_eq!(outcome.mv, mv(4, 8));

        let played = board.play(mv(4, 8), X);
        let direct = Heuristic::exact().evaluate(&played, &mut ChaCha20Rng::seed_from_u64(0));
        assert_eq!(outcome.score, direct.score);
        assert_eq!(outcome.terminal, direct.terminal);
    }
}

#[test]
fn zero_budget_still_answers_with_a_legal_move() {
    let mut board = board_with(
        &[
            (4, 4, PlayerMarker::X),
            (4, 0, PlayerMarker::O),
            (0, 8, PlayerMarker::X),
        ],
        Sectors::default(),
    );
    let before = board.clone();
    let outcome = Searcher::from_config(&SearchConfig::seeded(7))
        .unwrap()
        .best_move(&mut board, PlayerMarker::O, 8, Duration::ZERO)
        .unwrap();
    assert_eq!(board, before);
    assert!(board.allowed_moves().contains(&outcome.mv));
    assert!(outcome.timed_out);
}

#[test]
fn board_is_unchanged_after_a_deep_search() {
    let mut board = board_with(
        &[
            (4, 4, PlayerMarker::X),
            (4, 2, PlayerMarker::O),
            (2, 4, PlayerMarker::X),
        ],
        Sector::Center.into(),
    );
    let before = board.clone();
    let before_text = board.to_string();
    let outcome = Searcher::from_config(&SearchConfig::seeded(2))
        .unwrap()
        .best_move(&mut board, PlayerMarker::O, 3, AMPLE)
        .unwrap();
    assert_eq!(board, before);
    assert_eq!(board.to_string(), before_text);
    assert_eq!(outcome.mv.meta_index, 4);
}

/// Full-width search with the same move semantics as `Searcher`: terminal
/// children are scored directly, depth 0 takes the best direct evaluation.
fn minimax(board: &mut MetaBoard, player: PlayerMarker, depth: u32) -> f64 {
    let sign = player.sign();
    let mut best = f64::NEG_INFINITY;
    for mv in board.allowed_moves().iter().copied() {
        let mut played = board.play(mv, player);
        let eval = position_score(&played);
        let value = if depth == 0 || eval.terminal {
            eval.score
        } else {
            minimax(&mut played, player.to_other(), depth - 1)
        };
        best = best.max(sign * value);
    }
    sign * best
}

fn random_position(seed: u64, plies: usize) -> (MetaBoard, PlayerMarker) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut board = MetaBoard::empty();
    let mut player = PlayerMarker::X;
    for _ in 0..plies {
        let moves = board.allowed_moves();
        if board.winner().is_some() || moves.is_empty() {
            break;
        }
        board.push(moves[rng.gen_range(0..moves.len())], player);
        player = player.to_other();
    }
    (board, player)
}

#[test]
fn pruned_search_matches_full_minimax() {
    let mut checked = 0;
    for seed in 0..40 {
        let (mut board, player) = random_position(seed, 8 + (seed as usize % 20));
        let moves = board.allowed_moves();
        if board.winner().is_some() || moves.len() < 2 || moves.len() > 20 {
            continue;
        }
        for depth in 0..=2 {
            let outcome = exact_searcher()
                .best_move(&mut board, player, depth, AMPLE)
                .unwrap();
            let expected = minimax(&mut board, player, depth);
            assert_eq!(
                outcome.score, expected,
                "seed {} depth {}\n{}",
                seed, depth, board
            );
        }
        checked += 1;
    }
    assert!(checked >= 10, "only {} positions checked", checked);
}
