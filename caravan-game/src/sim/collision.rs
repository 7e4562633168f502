//! Axis-aligned proximity tests between the player, bullets and NPCs.
use crate::config::CollisionConfig;
use crate::data::EncounterId;
use crate::spawn::{CoinSize, Npc, NpcKind};

use super::{Bullet, Position};

/// True when both axis distances are strictly inside `radius`.
#[must_use]
pub fn within(a: Position, b: Position, radius: f32) -> bool {
    (a.x - b.x).abs() < radius && (a.y - b.y).abs() < radius
}

/// The single contact resolved for the caravan this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Coin { index: usize, size: CoinSize },
    MysteryBox { index: usize },
    Encounter { index: usize, encounter: EncounterId },
}

/// Highest-priority contact: any coin, then any mystery box, then any
/// encounter-bearing NPC. Travelers are never touched by the caravan.
#[must_use]
pub fn caravan_contact(npcs: &[Npc], at: Position, cfg: &CollisionConfig) -> Option<Contact> {
    let coin = npcs.iter().enumerate().find_map(|(index, npc)| match npc.kind {
        NpcKind::Coin { size } if within(npc.position(), at, cfg.pickup_radius) => {
            Some(Contact::Coin { index, size })
        }
        _ => None,
    });
    if coin.is_some() {
        return coin;
    }
    let mystery = npcs.iter().position(|npc| {
        matches!(npc.kind, NpcKind::MysteryBox) && within(npc.position(), at, cfg.pickup_radius)
    });
    if let Some(index) = mystery {
        return Some(Contact::MysteryBox { index });
    }
    npcs.iter().enumerate().find_map(|(index, npc)| {
        let encounter = npc.encounter()?;
        within(npc.position(), at, cfg.encounter_radius)
            .then_some(Contact::Encounter { index, encounter })
    })
}

/// First bullet (in firing order) overlapping a shootable NPC.
#[must_use]
pub fn bullet_hit(bullets: &[Bullet], npcs: &[Npc], radius: f32) -> Option<(usize, usize)> {
    bullets.iter().enumerate().find_map(|(bullet_idx, bullet)| {
        npcs.iter()
            .position(|npc| npc.is_shootable() && within(npc.position(), bullet.position(), radius))
            .map(|npc_idx| (bullet_idx, npc_idx))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Passenger, PassengerType};

    fn npc(id: u32, x: f32, y: f32, kind: NpcKind) -> Npc {
        Npc {
            id,
            x,
            y,
            kind,
            speed_multiplier: 1.0,
        }
    }

    #[test]
    fn coin_beats_encounter_regardless_of_order() {
        let cfg = CollisionConfig::default();
        let at = Position { x: 200.0, y: 300.0 };
        let npcs = vec![
            npc(
                1,
                205.0,
                300.0,
                NpcKind::Trader {
                    encounter: EncounterId::FoodCart,
                },
            ),
            npc(
                2,
                210.0,
                310.0,
                NpcKind::Coin {
                    size: CoinSize::Small,
                },
            ),
        ];
        assert_eq!(
            caravan_contact(&npcs, at, &cfg),
            Some(Contact::Coin {
                index: 1,
                size: CoinSize::Small
            })
        );
    }

    #[test]
    fn encounter_radius_is_wider_than_pickup() {
        let cfg = CollisionConfig::default();
        let at = Position { x: 200.0, y: 300.0 };
        let npcs = vec![
            npc(
                1,
                240.0,
                300.0,
                NpcKind::Coin {
                    size: CoinSize::Big,
                },
            ),
            npc(2, 240.0, 300.0, NpcKind::Haven),
        ];
        assert_eq!(
            caravan_contact(&npcs, at, &cfg),
            Some(Contact::Encounter {
                index: 1,
                encounter: EncounterId::HavenCheckpoint
            })
        );
    }

    #[test]
    fn travelers_do_not_collide_with_caravan() {
        let cfg = CollisionConfig::default();
        let at = Position { x: 200.0, y: 300.0 };
        let npcs = vec![npc(
            1,
            200.0,
            300.0,
            NpcKind::Person {
                passenger: Passenger::traveler(1, PassengerType::Cook),
            },
        )];
        assert_eq!(caravan_contact(&npcs, at, &cfg), None);
    }

    #[test]
    fn bullets_skip_coins_and_haven() {
        let bullets = vec![Bullet {
            id: 1,
            x: 500.0,
            y: 300.0,
            vx: 12.0,
            vy: 0.0,
        }];
        let mut npcs = vec![
            npc(1, 505.0, 300.0, NpcKind::Haven),
            npc(
                2,
                505.0,
                300.0,
                NpcKind::Coin {
                    size: CoinSize::Small,
                },
            ),
        ];
        assert_eq!(bullet_hit(&bullets, &npcs, 30.0), None);
        npcs.push(npc(
            3,
            520.0,
            290.0,
            NpcKind::Trader {
                encounter: EncounterId::BanditToll,
            },
        ));
        assert_eq!(bullet_hit(&bullets, &npcs, 30.0), Some((0, 2)));
    }
}
