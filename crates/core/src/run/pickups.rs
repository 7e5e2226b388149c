use super::*;

impl Run {
    /// Collects `pickup` if it is still enabled. Returns whether anything was collected.
    pub fn on_pickup_overlap(&mut self, pickup: PickupId) -> bool {
        if let Some(identity) = self.world().pickup(pickup).map(|p| p.identity.clone()) {
            self.record(RunInput::Pickup { identity });
        }
        let collected = self.collect(pickup);
        self.flush_save();
        collected
    }

    fn collect(&mut self, id: PickupId) -> bool {
        if self.phase == RunPhase::GameOver {
            return false;
        }
        let Some(pickup) = self.assembler.world_mut().pickup_mut(id) else {
            debug!(?id, "overlap with unknown pickup");
            return false;
        };
        if !pickup.enabled {
            return false;
        }
        pickup.enabled = false;
        let (kind, value, identity) = (pickup.kind, pickup.value, pickup.identity.clone());

        if !self.collected.insert(kind, identity.clone()) {
            warn!(%identity, "pickup identity was already collected");
            return false;
        }
        let new_total = match kind {
            CollectibleKind::Coin => {
                self.coin_total += value;
                self.coin_total
            }
            CollectibleKind::Egg => {
                self.egg_total += value;
                self.egg_total
            }
        };
        debug!(%identity, ?kind, value, new_total, "pickup collected");
        self.emit(RunEvent::RewardChanged { collectible: kind, new_total });
        self.mark_dirty();
        true
    }
}
