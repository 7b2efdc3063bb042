use crate::types::{AccountId, Game, GameId};
use sha2::{Digest, Sha256};

/// Pluggable outcome verification for cooperative resolution.
///
/// Game-specific logic goes behind this trait; custody and payout code never
/// touch it.
pub trait OutcomeVerifier: Send + Sync {
    fn verify(&self, game: &Game, claimed_winner: &AccountId, proof: &[u8]) -> bool;
}

/// Default verifier: the proof must equal the binding of the participant
/// pair stored when the game activated. A placeholder for real outcome
/// verification supplied by the embedding application.
#[derive(Debug, Default)]
pub struct BindingVerifier;

impl OutcomeVerifier for BindingVerifier {
    fn verify(&self, game: &Game, _claimed_winner: &AccountId, proof: &[u8]) -> bool {
        match &game.state_commitment {
            Some(expected) => proof == expected.as_slice(),
            None => false,
        }
    }
}

/// Deterministic binding of a game's participant pair.
pub fn participant_binding(game_id: GameId, player1: &AccountId, player2: &AccountId) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(game_id.to_be_bytes());
    hasher.update(player1.as_str().as_bytes());
    hasher.update(player2.as_str().as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn game_with_commitment(commitment: Option<Vec<u8>>) -> Game {
        Game {
            id: 7,
            player1: AccountId::new("alice"),
            player2: Some(AccountId::new("bob")),
            wager: 100,
            asset: crate::types::AssetRef::Native,
            created_at: Utc::now(),
            resolved_at: None,
            winner: None,
            state_commitment: commitment,
        }
    }

    #[test]
    fn binding_is_deterministic() {
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        assert_eq!(
            participant_binding(0, &alice, &bob),
            participant_binding(0, &alice, &bob)
        );
    }

    #[test]
    fn binding_differs_per_game_and_pair() {
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");
        let carol = AccountId::new("carol");

        let base = participant_binding(0, &alice, &bob);
        assert_ne!(base, participant_binding(1, &alice, &bob));
        assert_ne!(base, participant_binding(0, &bob, &alice));
        assert_ne!(base, participant_binding(0, &alice, &carol));
    }

    #[test]
    fn verifier_accepts_stored_binding() {
        let binding = participant_binding(7, &AccountId::new("alice"), &AccountId::new("bob"));
        let game = game_with_commitment(Some(binding.clone()));

        assert!(BindingVerifier.verify(&game, &AccountId::new("alice"), &binding));
    }

    #[test]
    fn verifier_rejects_wrong_proof() {
        let binding = participant_binding(7, &AccountId::new("alice"), &AccountId::new("bob"));
        let game = game_with_commitment(Some(binding));

        assert!(!BindingVerifier.verify(&game, &AccountId::new("alice"), b"not the binding"));
    }

    #[test]
    fn verifier_rejects_unset_commitment() {
        let game = game_with_commitment(None);
        assert!(!BindingVerifier.verify(&game, &AccountId::new("alice"), b""));
    }
}
