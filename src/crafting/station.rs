//! Crafting Station
//!
//! One craft at a time: Idle -> Crafting on `start_craft`, back to Idle on
//! `cancel` or when `poll` sees the clock pass the recipe duration. Progress
//! is always recomputed from absolute clock readings, never accumulated, so a
//! station that nobody polls keeps crafting and a reloaded station resumes
//! exactly where the saved clock says it is.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::clock::GameClock;
use super::definition::{CraftingItem, Recipe};
use super::events::{CraftingEvent, CraftingObserver};
use super::ledger::{Agent, Ledger};
use super::output::CraftedItemSlot;
use super::persistence::{CraftingState, StationSnapshot};
use super::registry::CraftingRegistry;
use crate::data::ItemRegistry;
use crate::error::CraftError;

/// Highest progress reported for a craft that hasn't finished yet
const UNFINISHED_MAX: f32 = 1.0 - f32::EPSILON;

/// What the station is doing right now
#[derive(Debug, Clone)]
pub enum StationState {
    Idle,
    Crafting {
        recipe: Arc<Recipe>,
        /// Agent that paid for the ingredients
        crafter: String,
        /// Clock reading when the craft started
        started_at: f64,
        /// Last computed progress, 0.0 to 1.0
        progress: f32,
    },
}

impl StationState {
    pub fn tag(&self) -> CraftingState {
        match self {
            StationState::Idle => CraftingState::Idle,
            StationState::Crafting { .. } => CraftingState::Crafting,
        }
    }
}

pub struct CraftingStation {
    id: String,
    recipes: Arc<CraftingRegistry>,
    items: Arc<ItemRegistry>,
    clock: Arc<GameClock>,
    state: StationState,
    output: CraftedItemSlot,
    observers: Vec<Box<dyn CraftingObserver>>,
}

impl fmt::Debug for CraftingStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CraftingStation")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("output", &self.output)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl CraftingStation {
    pub fn new(
        id: &str,
        recipes: Arc<CraftingRegistry>,
        items: Arc<ItemRegistry>,
        clock: Arc<GameClock>,
    ) -> Self {
        Self {
            id: id.to_string(),
            recipes,
            items,
            clock,
            state: StationState::Idle,
            output: CraftedItemSlot::new(),
            observers: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &StationState {
        &self.state
    }

    pub fn is_crafting(&self) -> bool {
        matches!(self.state, StationState::Crafting { .. })
    }

    pub fn current_recipe(&self) -> Option<&Arc<Recipe>> {
        match &self.state {
            StationState::Idle => None,
            StationState::Crafting { recipe, .. } => Some(recipe),
        }
    }

    /// Who started the current craft
    pub fn crafter(&self) -> Option<&str> {
        match &self.state {
            StationState::Idle => None,
            StationState::Crafting { crafter, .. } => Some(crafter),
        }
    }

    /// Last computed progress; 0 while idle
    pub fn progress(&self) -> f32 {
        match &self.state {
            StationState::Idle => 0.0,
            StationState::Crafting { progress, .. } => *progress,
        }
    }

    pub fn output(&self) -> &CraftedItemSlot {
        &self.output
    }

    /// Every recipe this station knows, in catalog order
    pub fn recipes(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.all()
    }

    /// Register a listener for this station's events
    pub fn subscribe(&mut self, observer: impl CraftingObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: CraftingEvent) {
        for observer in &mut self.observers {
            observer.notify(&event);
        }
    }

    // ========================================================================
    // Gating
    // ========================================================================

    /// Why `recipe` can't be crafted by `agent` right now, if it can't.
    ///
    /// Stops at the first failing check: agent collaborators, level,
    /// ingredients, then output compatibility.
    pub fn check_craft(&self, recipe: &Recipe, agent: &dyn Agent) -> Result<(), CraftError> {
        let ledger = agent.ledger().ok_or(CraftError::NoLedger)?;
        let level = agent.level().ok_or(CraftError::NoLevel)?;

        if level < recipe.level_required() {
            return Err(CraftError::LevelTooLow {
                required: recipe.level_required(),
                current: level,
            });
        }

        for ingredient in recipe.ingredients() {
            let held = ledger.has_quantity(&ingredient.item_id);
            if held < ingredient.count {
                return Err(CraftError::MissingIngredient {
                    item_id: ingredient.item_id.clone(),
                    required: ingredient.count,
                    held,
                });
            }
        }

        if !self.output.can_accept(recipe.result(), &self.items) {
            return Err(CraftError::OutputBlocked {
                held: self.output.item_id().unwrap_or_default().to_string(),
                incoming: recipe.result().item_id.clone(),
            });
        }

        Ok(())
    }

    /// Side-effect free check used for gating and for UI affordances
    pub fn can_craft(&self, recipe: &Recipe, agent: &dyn Agent) -> bool {
        self.check_craft(recipe, agent).is_ok()
    }

    /// Every recipe paired with whether `agent` could start it here right now
    pub fn availability(&self, agent: &dyn Agent) -> Vec<(&Arc<Recipe>, Result<(), CraftError>)> {
        self.recipes()
            .map(|recipe| (recipe, self.check_craft(recipe, agent)))
            .collect()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Idle -> Crafting. Takes the ingredients from the agent and starts the clock.
    ///
    /// A refusal changes nothing and fires no event.
    pub fn start_craft(&mut self, recipe_id: &str, agent: &mut dyn Agent) -> Result<(), CraftError> {
        if let Some(current) = self.current_recipe() {
            let err = CraftError::Busy(current.id().to_string());
            debug!("Station {} refused '{}': {}", self.id, recipe_id, err);
            return Err(err);
        }

        let recipe = self
            .recipes
            .get(recipe_id)
            .cloned()
            .ok_or_else(|| CraftError::UnknownRecipe(recipe_id.to_string()))?;

        if let Err(err) = self.check_craft(&recipe, agent) {
            debug!("Station {} refused '{}': {}", self.id, recipe_id, err);
            return Err(err);
        }

        let ledger = agent.ledger_mut().ok_or(CraftError::NoLedger)?;
        take_ingredients(&self.id, &recipe, ledger)?;

        let started_at = self.clock.now();
        info!(
            "Station {} started crafting {} ({}s) at {:.3}",
            self.id,
            recipe.id(),
            recipe.duration_secs(),
            started_at
        );
        self.state = StationState::Crafting {
            recipe: recipe.clone(),
            crafter: agent.agent_id().to_string(),
            started_at,
            progress: 0.0,
        };

        self.emit(CraftingEvent::Started {
            station_id: self.id.clone(),
            recipe_id: recipe.id().to_string(),
        });
        Ok(())
    }

    /// Crafting -> Idle, refunding every ingredient to the agent that paid for them.
    ///
    /// Anyone else is refused and the craft keeps running.
    pub fn cancel(&mut self, agent: &mut dyn Agent) -> Result<(), CraftError> {
        match self.crafter() {
            None => return Err(CraftError::NotCrafting),
            // Saves from before crafters were recorded have no owner
            Some(owner) if !owner.is_empty() && owner != agent.agent_id() => {
                let err = CraftError::NotCrafter {
                    owner: owner.to_string(),
                };
                debug!("Station {} refused cancel by {}: {}", self.id, agent.agent_id(), err);
                return Err(err);
            }
            Some(_) => {}
        }
        let StationState::Crafting { recipe, .. } =
            std::mem::replace(&mut self.state, StationState::Idle)
        else {
            return Err(CraftError::NotCrafting);
        };

        match agent.ledger_mut() {
            Some(ledger) => {
                for ingredient in recipe.ingredients() {
                    let lost = ledger.add_best_effort(&ingredient.item_id, ingredient.count);
                    if lost > 0 {
                        error!(
                            "Station {}: refund of {} x{} did not fit, {} lost",
                            self.id, ingredient.item_id, ingredient.count, lost
                        );
                    }
                }
            }
            None => error!(
                "Station {}: no inventory to refund '{}' ingredients into",
                self.id,
                recipe.id()
            ),
        }

        info!("Station {} cancelled crafting {}", self.id, recipe.id());
        self.emit(CraftingEvent::Cancelled {
            station_id: self.id.clone(),
            recipe_id: recipe.id().to_string(),
        });
        Ok(())
    }

    /// Recompute progress from the clock, finishing the craft once it reaches 1.
    ///
    /// Returns the reported progress, or `None` while idle.
    pub fn poll(&mut self) -> Option<f32> {
        let now = self.clock.now();
        let (recipe, progress, finished) = match &mut self.state {
            StationState::Idle => return None,
            StationState::Crafting {
                recipe,
                started_at,
                progress,
                ..
            } => {
                let (value, finished) = compute_progress(now - *started_at, recipe.duration_secs());
                *progress = value;
                (recipe.clone(), value, finished)
            }
        };

        self.emit(CraftingEvent::Progress {
            station_id: self.id.clone(),
            recipe_id: recipe.id().to_string(),
            progress,
        });

        if finished {
            self.complete(&recipe);
        }
        Some(progress)
    }

    fn complete(&mut self, recipe: &Recipe) {
        self.state = StationState::Idle;
        let result = recipe.result().clone();

        if self.output.deposit(&result, &self.items) {
            info!(
                "Station {} finished {} -> {} x{}",
                self.id,
                recipe.id(),
                result.item_id,
                result.count
            );
            self.emit(CraftingEvent::Completed {
                station_id: self.id.clone(),
                recipe_id: recipe.id().to_string(),
                result,
            });
        } else {
            error!(
                "Station {} crafted {} x{} but the output slot holds {:?}; result dropped",
                self.id,
                result.item_id,
                result.count,
                self.output.contents()
            );
            self.emit(CraftingEvent::OutputDropped {
                station_id: self.id.clone(),
                recipe_id: recipe.id().to_string(),
                result,
            });
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Take up to `count` items out of the output slot
    pub fn withdraw_output(&mut self, count: u32) -> Option<CraftingItem> {
        let item = self.output.withdraw(count)?;
        self.emit(CraftingEvent::OutputWithdrawn {
            station_id: self.id.clone(),
            item: item.clone(),
        });
        Some(item)
    }

    /// Move as much of the output as fits into the agent's inventory.
    /// Returns how many items were moved.
    pub fn claim_output(&mut self, agent: &mut dyn Agent) -> u32 {
        let Some(held) = self.output.contents() else {
            return 0;
        };
        let Some(ledger) = agent.ledger_mut() else {
            debug!("Station {}: no inventory to claim output into", self.id);
            return 0;
        };

        let fits = largest_fit(&*ledger, &held.item_id, held.count);
        if fits == 0 {
            debug!("Station {}: no room for {}", self.id, held.item_id);
            return 0;
        }

        let refused = ledger.add_best_effort(&held.item_id, fits).min(fits);
        if refused > 0 {
            error!(
                "Station {}: inventory reported space for {} x{} but refused {}",
                self.id, held.item_id, fits, refused
            );
        }
        // Only what actually landed leaves the slot
        if fits == refused {
            return 0;
        }
        self.withdraw_output(fits - refused).map_or(0, |item| item.count)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn capture(&self) -> StationSnapshot {
        let (start_time, recipe_id, crafter_id, progress) = match &self.state {
            StationState::Idle => (0.0, String::new(), String::new(), 0.0),
            StationState::Crafting {
                recipe,
                crafter,
                started_at,
                progress,
            } => (*started_at, recipe.id().to_string(), crafter.clone(), *progress),
        };
        StationSnapshot {
            state: self.state.tag(),
            start_time,
            recipe_id,
            crafter_id,
            progress,
            output_item_id: self.output.item_id().unwrap_or_default().to_string(),
            output_amount: self.output.amount(),
        }
    }

    /// Put saved state back without re-running any craft checks or firing events.
    ///
    /// A crafting snapshot whose recipe no longer exists comes back Idle.
    pub fn restore(&mut self, snapshot: &StationSnapshot) {
        self.output = if snapshot.output_item_id.is_empty() || snapshot.output_amount == 0 {
            CraftedItemSlot::new()
        } else if self.items.contains(&snapshot.output_item_id) {
            CraftedItemSlot::with_contents(&snapshot.output_item_id, snapshot.output_amount)
        } else {
            warn!(
                "Station {}: saved output '{}' is not a known item, clearing it",
                self.id, snapshot.output_item_id
            );
            CraftedItemSlot::new()
        };

        self.state = match snapshot.state {
            CraftingState::Idle => StationState::Idle,
            CraftingState::Crafting => match self.recipes.get(&snapshot.recipe_id) {
                Some(recipe) => StationState::Crafting {
                    recipe: recipe.clone(),
                    crafter: snapshot.crafter_id.clone(),
                    started_at: snapshot.start_time,
                    progress: snapshot.progress.clamp(0.0, UNFINISHED_MAX),
                },
                None => {
                    warn!(
                        "Station {}: saved recipe '{}' no longer exists, resetting to idle",
                        self.id, snapshot.recipe_id
                    );
                    StationState::Idle
                }
            },
        };
    }
}

/// Remove every ingredient, or none of them.
///
/// If the ledger comes up short after the ingredient check passed, whatever
/// was already taken is handed back.
fn take_ingredients(station_id: &str, recipe: &Recipe, ledger: &mut dyn Ledger) -> Result<(), CraftError> {
    let mut taken: Vec<(&str, u32)> = Vec::with_capacity(recipe.ingredients().len());

    for ingredient in recipe.ingredients() {
        let missing = ledger.remove(&ingredient.item_id, ingredient.count).min(ingredient.count);
        let removed = ingredient.count - missing;
        if removed > 0 {
            taken.push((&ingredient.item_id, removed));
        }
        if missing == 0 {
            continue;
        }

        error!(
            "Station {}: inventory was short {} {} for {} after the check passed, rolling back",
            station_id,
            missing,
            ingredient.item_id,
            recipe.id()
        );
        for (item_id, count) in taken {
            let lost = ledger.add_best_effort(item_id, count);
            if lost > 0 {
                error!(
                    "Station {}: rollback of {} x{} did not fit, {} lost",
                    station_id, item_id, count, lost
                );
            }
        }
        return Err(CraftError::LedgerInconsistent {
            item_id: ingredient.item_id.clone(),
        });
    }

    Ok(())
}

/// Progress for `elapsed` seconds of a `duration` second craft, and whether it's done
fn compute_progress(elapsed: f64, duration: f64) -> (f32, bool) {
    if duration <= 0.0 {
        return (1.0, true);
    }
    let ratio = (elapsed / duration).clamp(0.0, 1.0);
    if ratio >= 1.0 {
        (1.0, true)
    } else {
        ((ratio as f32).min(UNFINISHED_MAX), false)
    }
}

/// Largest n <= wanted such that the ledger has space for n items
fn largest_fit(ledger: &dyn Ledger, item_id: &str, wanted: u32) -> u32 {
    if ledger.has_space_for(item_id, wanted) {
        return wanted;
    }
    let (mut low, mut high) = (0, wanted);
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if ledger.has_space_for(item_id, mid) {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}
