//! Simulation systems.
//!
//! Every system copies what it needs from [`ConfigSystem`] in `on_create`,
//! creating it with default settings if the world has none yet. Systems that
//! draw random numbers seed a [`Pcg32`] stream from the config seed and visit
//! rows in entity order, so a run is reproducible for a given seed.

use biome_ecs::command::{CommandBuffer, CommandKind};
use biome_ecs::entity::EntityId;
use biome_ecs::filter::{Filter, Row};
use biome_ecs::system::{System, SystemContext, SystemRegistry};
use biome_ecs::world::World;
use biome_ecs::EcsError;
use rand::Rng;
use rand_pcg::Pcg32;
use tracing::{debug, info};

use crate::components::{
    DeadTag, EntityName, Goal, Health, Hunger, LifeTime, MoveSpeed, Position, Priority,
    SimComponent, SimKind, Strength, TargetPosition, Team, Vec2,
};
use crate::settings::SimSettings;
use crate::spawn;

type Ctx<'w> = SystemContext<'w, SimComponent>;

const LIFE_TIME_STREAM: u64 = 1;
const EVOLVE_STREAM: u64 = 2;
const FOOD_STREAM: u64 = 3;
const DAMAGE_STREAM: u64 = 5;
const REPRODUCE_STREAM: u64 = 6;
const BOT_STREAM: u64 = 7;

/// Speed a hunter gains per second while hunting.
const HUNTER_SPEED_GAIN: f64 = 0.02;
/// Speed a hunter loses per second while doing anything else.
const HUNTER_SPEED_LOSS: f64 = 0.002;
const MIN_HUNTER_SPEED: f64 = 1.5;
/// Fleeing creatures run this many times further than their team's centre.
const RUN_AWAY_SCALE: f64 = 4.0;

const KILL_REASONS: [&str; 5] = [
    "a bite",
    "a crushing grab",
    "a scratch",
    "a blow to the head",
    "sunstroke",
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(world: &mut World<SimComponent>) -> Result<&ConfigSystem, EcsError> {
    world.get_or_create_system::<ConfigSystem>().map(|config| &*config)
}

/// Queue a [`DeadTag`] unless one is already queued for `entity` this frame.
fn mark_dead(commands: &mut CommandBuffer<SimComponent>, entity: EntityId, reason: &str) {
    let already_queued = commands.commands().iter().any(|c| {
        matches!(
            &c.kind,
            CommandKind::Attach { entity: e, component: SimComponent::DeadTag(_) } if *e == entity
        )
    });
    if !already_queued {
        commands.attach(entity, DeadTag::because(reason).into());
    }
}

/// Queue `components` as a new entity named after its slot.
fn spawn_named(ctx: &mut Ctx<'_>, components: Vec<SimComponent>) -> EntityId {
    let entity = ctx.spawn(components);
    ctx.commands
        .attach(entity, EntityName(format!("Bot{}", entity.slot())).into());
    entity
}

fn creature_count(ctx: &Ctx<'_>) -> usize {
    ctx.store.holders(SimKind::Hunger).map_or(0, |h| h.len())
}

/// Every system in the simulation, in registration order.
pub fn registry() -> SystemRegistry<SimComponent> {
    SystemRegistry::new()
        .with::<ConfigSystem>()
        .with::<FoodSpawnSystem>()
        .with::<HungerSystem>()
        .with::<GatheringSystem>()
        .with::<HuntingSystem>()
        .with::<DamageSystem>()
        .with::<PriorityControlSystem>()
        .with::<RunAwaySystem>()
        .with::<MoveToTargetSystem>()
        .with::<EvolveSystem>()
        .with::<LifeTimeSystem>()
        .with::<ReproduceSystem>()
        .with::<BotCreationSystem>()
        .with::<DeathSystem>()
        .with::<PositionLimitSystem>()
        .with::<KillSystem>()
}

// ---------------------------------------------------------------------------
// ConfigSystem
// ---------------------------------------------------------------------------

/// Holds the settings and seed shared by the other systems, and tracks
/// simulated time. Runs before everything else.
#[derive(Debug, Clone, Default)]
pub struct ConfigSystem {
    settings: SimSettings,
    seed: u64,
    elapsed: f64,
}

impl ConfigSystem {
    pub fn new(settings: SimSettings, seed: u64) -> Self {
        Self {
            settings,
            seed,
            elapsed: 0.0,
        }
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulated seconds since the system was created.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Random stream `stream` of this world's seed.
    pub fn rng(&self, stream: u64) -> Pcg32 {
        Pcg32::new(self.seed, stream)
    }
}

impl System<SimComponent> for ConfigSystem {
    fn on_update(&mut self, _ctx: &mut Ctx<'_>, dt: f64) {
        self.elapsed += dt;
    }

    fn update_order(&self) -> i32 {
        i32::MIN
    }
}

// ---------------------------------------------------------------------------
// HungerSystem
// ---------------------------------------------------------------------------

/// Drains hunger every `hunger_tick_delay` seconds. Faster creatures burn
/// more. A creature at zero hunger loses health instead.
#[derive(Debug, Default)]
pub struct HungerSystem {
    settings: SimSettings,
    hunger_time: f64,
    filter: Filter<SimKind>,
}

impl System<SimComponent> for HungerSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.settings = config(world)?.settings().clone();
        self.filter = Filter::new()
            .require(SimKind::Hunger)
            .require(SimKind::Health)
            .optional(SimKind::MoveSpeed)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        self.hunger_time += dt;
        if self.hunger_time < self.settings.hunger_tick_delay {
            return;
        }
        self.hunger_time = 0.0;

        let settings = &self.settings;
        for mut row in ctx.store.query_mut(&self.filter) {
            let speed = row.get_as::<MoveSpeed>().map_or(0.0, |s| s.0);
            let Some(hunger) = row.get_as_mut::<Hunger>() else {
                continue;
            };
            hunger.0 -= 1.0 + speed * settings.speed_hunger_multiplier;
            if hunger.0 > 0.0 {
                continue;
            }
            hunger.0 = 0.0;
            if let Some(health) = row.get_as_mut::<Health>() {
                health.0 = health.0 * settings.starvation_health_factor
                    - settings.starvation_health_penalty;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MoveToTargetSystem
// ---------------------------------------------------------------------------

/// Walks entities toward their target and clears the target on arrival.
#[derive(Debug, Default)]
pub struct MoveToTargetSystem {
    filter: Filter<SimKind>,
}

impl System<SimComponent> for MoveToTargetSystem {
    fn on_create(&mut self, _world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.filter = Filter::new()
            .require(SimKind::MoveSpeed)
            .require(SimKind::Position)
            .require(SimKind::TargetPosition)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        for mut row in ctx.store.query_mut(&self.filter) {
            let Some(speed) = row.get_as::<MoveSpeed>().map(|s| s.0) else {
                continue;
            };
            let Some((position, target)) = row.pair_mut::<Position, TargetPosition>() else {
                continue;
            };
            let Some(goal) = target.0 else {
                continue;
            };
            let delta = goal - position.0;
            // Arrived once within sqrt(speed / 2) of the goal.
            if delta.sqr_len() > speed * 0.5 {
                position.0 += delta.normalized() * (speed * dt);
            } else {
                position.0 = goal;
                target.0 = None;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PositionLimitSystem
// ---------------------------------------------------------------------------

/// Pulls anything outside the world disc back onto its edge.
#[derive(Debug, Default)]
pub struct PositionLimitSystem {
    world_size: f64,
    filter: Filter<SimKind>,
}

impl System<SimComponent> for PositionLimitSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.world_size = config(world)?.settings().world_size;
        self.filter = Filter::new().require(SimKind::Position);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, _dt: f64) {
        for mut row in ctx.store.query_mut(&self.filter) {
            if let Some(position) = row.get_as_mut::<Position>() {
                if position.0.len() > self.world_size {
                    position.0 = position.0.normalized() * self.world_size;
                }
            }
        }
    }

    fn update_order(&self) -> i32 {
        100
    }
}

// ---------------------------------------------------------------------------
// FoodSpawnSystem
// ---------------------------------------------------------------------------

/// Scatters a batch of bushes every `food_create_delay` seconds while there is
/// room for a full batch under `max_food`.
pub struct FoodSpawnSystem {
    settings: SimSettings,
    time: f64,
    rng: Pcg32,
}

impl Default for FoodSpawnSystem {
    fn default() -> Self {
        Self {
            settings: SimSettings::default(),
            time: 0.0,
            rng: Pcg32::new(0, FOOD_STREAM),
        }
    }
}

impl System<SimComponent> for FoodSpawnSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        let config = config(world)?;
        self.settings = config.settings().clone();
        self.rng = config.rng(FOOD_STREAM);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        self.time += dt;
        if self.time < self.settings.food_create_delay {
            return;
        }
        self.time = 0.0;

        let bushes = ctx.store.holders(SimKind::BushTag).map_or(0, |b| b.len());
        if bushes + self.settings.food_batch_size > self.settings.max_food {
            return;
        }
        for _ in 0..self.settings.food_batch_size {
            ctx.spawn(spawn::food(&mut self.rng, &self.settings));
        }
    }
}

// ---------------------------------------------------------------------------
// GatheringSystem
// ---------------------------------------------------------------------------

/// Every `gathering_interval` seconds, points each gathering creature at the
/// nearest bush and eats it once in reach. A bush feeds one creature per pass.
#[derive(Debug, Default)]
pub struct GatheringSystem {
    settings: SimSettings,
    time: f64,
    creatures: Filter<SimKind>,
    bushes: Filter<SimKind>,
}

impl System<SimComponent> for GatheringSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.settings = config(world)?.settings().clone();
        self.creatures = Filter::new()
            .require(SimKind::Position)
            .require(SimKind::TargetPosition)
            .require(SimKind::Hunger)
            .optional(SimKind::Health)
            .optional(SimKind::Priority)
            .exclude(SimKind::DeadTag);
        self.bushes = Filter::new()
            .require(SimKind::Position)
            .require(SimKind::BushTag)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        self.time += dt;
        if self.time < self.settings.gathering_interval {
            return;
        }
        self.time = 0.0;

        let mut bushes: Vec<(EntityId, Vec2)> = ctx
            .store
            .query(&self.bushes)
            .iter()
            .filter_map(|row| row.get_as::<Position>().map(|p| (row.entity(), p.0)))
            .collect();
        bushes.sort_unstable_by_key(|(entity, _)| *entity);

        let reach = self.settings.eat_distance * self.settings.eat_distance;
        let mut rows = ctx.store.query_mut(&self.creatures);
        rows.sort_unstable_by_key(|row| row.entity());
        for mut row in rows {
            if bushes.is_empty() {
                break;
            }
            if row.get_as::<Priority>().is_some_and(|p| p.current != Goal::Gathering) {
                continue;
            }
            let Some(position) = row.get_as::<Position>().map(|p| p.0) else {
                continue;
            };
            let Some((index, distance)) = bushes
                .iter()
                .enumerate()
                .map(|(i, (_, bush))| (i, (*bush - position).sqr_len()))
                .min_by(|a, b| a.1.total_cmp(&b.1))
            else {
                continue;
            };

            let (bush, bush_position) = bushes[index];
            if distance > reach {
                if let Some(target) = row.get_as_mut::<TargetPosition>() {
                    target.0 = Some(bush_position);
                }
                continue;
            }

            bushes.remove(index);
            if let Some(hunger) = row.get_as_mut::<Hunger>() {
                hunger.0 += self.settings.bush_food_value;
            }
            if let Some(health) = row.get_as_mut::<Health>() {
                health.0 += self.settings.bush_health_value;
            }
            if let Some(target) = row.get_as_mut::<TargetPosition>() {
                target.0 = None;
            }
            mark_dead(ctx.commands, bush, "eaten");
        }
    }
}

// ---------------------------------------------------------------------------
// HuntingSystem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Combatant {
    entity: EntityId,
    position: Vec2,
    health: f64,
    strength: f64,
    team: u8,
    hunting: bool,
}

impl Combatant {
    fn from_row(row: &Row<'_, SimComponent>) -> Option<Self> {
        Some(Self {
            entity: row.entity(),
            position: row.get_as::<Position>()?.0,
            health: row.get_as::<Health>()?.0,
            strength: row.get_as::<Strength>()?.0,
            team: row.get_as::<Team>()?.0,
            hunting: row
                .get_as::<Priority>()
                .map_or(true, |p| p.current == Goal::Hunting),
        })
    }

    /// Whether `self` should win a straight fight with `prey`.
    fn outlasts(&self, prey: &Combatant) -> bool {
        self.health * self.strength >= prey.health * prey.strength
    }
}

/// Every `hunting_interval` seconds, points each hunting creature at the
/// nearest enemy it should beat. Creatures without a [`Priority`] always hunt.
#[derive(Debug, Default)]
pub struct HuntingSystem {
    interval: f64,
    time: f64,
    filter: Filter<SimKind>,
}

impl System<SimComponent> for HuntingSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.interval = config(world)?.settings().hunting_interval;
        self.filter = Filter::new()
            .require(SimKind::Position)
            .require(SimKind::TargetPosition)
            .require(SimKind::Strength)
            .require(SimKind::Health)
            .require(SimKind::Team)
            .optional(SimKind::Priority)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        self.time += dt;
        if self.time < self.interval {
            return;
        }
        self.time = 0.0;

        let mut creatures: Vec<Combatant> = ctx
            .store
            .query(&self.filter)
            .iter()
            .filter_map(Combatant::from_row)
            .collect();
        creatures.sort_unstable_by_key(|c| c.entity);

        let targets: Vec<(EntityId, Vec2)> = creatures
            .iter()
            .filter(|hunter| hunter.hunting)
            .filter_map(|hunter| {
                creatures
                    .iter()
                    .filter(|prey| prey.team != hunter.team && hunter.outlasts(prey))
                    .min_by(|a, b| {
                        let da = (a.position - hunter.position).sqr_len();
                        let db = (b.position - hunter.position).sqr_len();
                        da.total_cmp(&db)
                    })
                    .map(|prey| (hunter.entity, prey.position))
            })
            .collect();

        for (hunter, prey_position) in targets {
            if let Some(target) = ctx.store.get_as_mut::<TargetPosition>(hunter) {
                target.0 = Some(prey_position);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DamageSystem
// ---------------------------------------------------------------------------

/// Every `damage_interval` seconds, enemies within `attack_distance` hit each
/// other for `strength * damage_multiplier`, squared strength while hunting.
/// A killer gains `kill_treatment` health and `meat_food_value` hunger.
pub struct DamageSystem {
    settings: SimSettings,
    time: f64,
    filter: Filter<SimKind>,
    rng: Pcg32,
}

impl Default for DamageSystem {
    fn default() -> Self {
        Self {
            settings: SimSettings::default(),
            time: 0.0,
            filter: Filter::new(),
            rng: Pcg32::new(0, DAMAGE_STREAM),
        }
    }
}

impl System<SimComponent> for DamageSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        let config = config(world)?;
        self.settings = config.settings().clone();
        self.rng = config.rng(DAMAGE_STREAM);
        self.filter = Filter::new()
            .require(SimKind::Health)
            .require(SimKind::Strength)
            .require(SimKind::Team)
            .require(SimKind::Position)
            .require(SimKind::Hunger)
            .optional(SimKind::Priority)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        self.time += dt;
        if self.time < self.settings.damage_interval {
            return;
        }
        self.time = 0.0;

        let mut fighters: Vec<(Combatant, f64)> = ctx
            .store
            .query(&self.filter)
            .iter()
            .filter_map(Combatant::from_row)
            .filter(|c| c.health > 0.0)
            .map(|c| (c, 0.0))
            .collect();
        fighters.sort_unstable_by_key(|(c, _)| c.entity);

        let reach = self.settings.attack_distance * self.settings.attack_distance;
        for a in 0..fighters.len() {
            for v in 0..fighters.len() {
                let (attacker, victim) = (fighters[a].0, fighters[v].0);
                if a == v
                    || attacker.health <= 0.0
                    || victim.health <= 0.0
                    || attacker.team == victim.team
                    || (attacker.position - victim.position).sqr_len() > reach
                {
                    continue;
                }
                let multiplier = if attacker.hunting { attacker.strength } else { 1.0 };
                let damage = attacker.strength * self.settings.damage_multiplier * multiplier;
                fighters[v].0.health -= damage;
                if fighters[v].0.health > 0.0 {
                    continue;
                }
                fighters[a].0.health += self.settings.kill_treatment;
                fighters[a].1 += self.settings.meat_food_value;
                let reason = KILL_REASONS[self.rng.gen_range(0..KILL_REASONS.len())];
                debug!(
                    killer = %attacker.entity,
                    victim = %victim.entity,
                    reason,
                    "creature killed"
                );
                mark_dead(ctx.commands, victim.entity, reason);
            }
        }

        for (fighter, meat) in fighters {
            if let Some(health) = ctx.store.get_as_mut::<Health>(fighter.entity) {
                health.0 = fighter.health;
            }
            if let Some(hunger) = ctx.store.get_as_mut::<Hunger>(fighter.entity) {
                hunger.0 += meat;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PriorityControlSystem
// ---------------------------------------------------------------------------

/// Picks each creature's current goal from its hunger and health, and trains
/// or detrains hunters' speed.
#[derive(Debug, Default)]
pub struct PriorityControlSystem {
    settings: SimSettings,
    filter: Filter<SimKind>,
}

impl PriorityControlSystem {
    fn next_goal(&self, priority: Priority, hunger: f64, health: f64) -> Goal {
        let s = &self.settings;
        if hunger < s.extreme_hunger_value {
            Goal::Gathering
        } else if health < s.extreme_health_value {
            Goal::Safety
        } else if priority.target == Goal::Hunting
            && priority.current != Goal::Hunting
            && hunger < s.evolve_hunger_value - s.evolve_hunger_cost
        {
            Goal::Gathering
        } else {
            priority.target
        }
    }
}

impl System<SimComponent> for PriorityControlSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.settings = config(world)?.settings().clone();
        self.filter = Filter::new()
            .require(SimKind::Priority)
            .require(SimKind::Hunger)
            .require(SimKind::Health)
            .require(SimKind::MoveSpeed)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        for mut row in ctx.store.query_mut(&self.filter) {
            let (Some(priority), Some(hunger), Some(health)) = (
                row.get_as::<Priority>().copied(),
                row.get_as::<Hunger>().map(|h| h.0),
                row.get_as::<Health>().map(|h| h.0),
            ) else {
                continue;
            };

            if priority.target == Goal::Hunting {
                if let Some(speed) = row.get_as_mut::<MoveSpeed>() {
                    speed.0 = if priority.current == Goal::Hunting {
                        speed.0 + dt * HUNTER_SPEED_GAIN
                    } else {
                        (speed.0 - dt * HUNTER_SPEED_LOSS).max(MIN_HUNTER_SPEED)
                    };
                }
            }

            let current = self.next_goal(priority, hunger, health);
            if let Some(priority) = row.get_as_mut::<Priority>() {
                priority.current = current;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RunAwaySystem
// ---------------------------------------------------------------------------

/// Sends creatures whose goal is safety away past their team's centre.
#[derive(Debug, Default)]
pub struct RunAwaySystem {
    fleeing: Filter<SimKind>,
    members: Filter<SimKind>,
}

impl System<SimComponent> for RunAwaySystem {
    fn on_create(&mut self, _world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.fleeing = Filter::new()
            .require(SimKind::Priority)
            .require(SimKind::Position)
            .require(SimKind::TargetPosition)
            .require(SimKind::Team);
        self.members = Filter::new().require(SimKind::Position).require(SimKind::Team);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, _dt: f64) {
        let mut sums = [(0usize, Vec2::ZERO); spawn::TEAM_COUNT as usize];
        let mut members = ctx.store.query(&self.members);
        members.sort_unstable_by_key(|row| row.entity());
        for row in members {
            let (Some(team), Some(position)) = (row.get_as::<Team>(), row.get_as::<Position>())
            else {
                continue;
            };
            if let Some((count, sum)) = sums.get_mut(usize::from(team.0)) {
                *count += 1;
                *sum += position.0;
            }
        }

        for mut row in ctx.store.query_mut(&self.fleeing) {
            if row.get_as::<Priority>().map(|p| p.current) != Some(Goal::Safety) {
                continue;
            }
            let team = row.get_as::<Team>().map(|t| usize::from(t.0));
            let Some(&(count, sum)) = team.and_then(|t| sums.get(t)) else {
                continue;
            };
            if count == 0 {
                continue;
            }
            if let Some(target) = row.get_as_mut::<TargetPosition>() {
                target.0 = Some(sum * (RUN_AWAY_SCALE / count as f64));
            }
        }
    }

    fn update_order(&self) -> i32 {
        50
    }
}

// ---------------------------------------------------------------------------
// EvolveSystem
// ---------------------------------------------------------------------------

/// Spends surplus hunger on random stat changes.
pub struct EvolveSystem {
    settings: SimSettings,
    filter: Filter<SimKind>,
    rng: Pcg32,
}

impl Default for EvolveSystem {
    fn default() -> Self {
        Self {
            settings: SimSettings::default(),
            filter: Filter::new(),
            rng: Pcg32::new(0, EVOLVE_STREAM),
        }
    }
}

impl System<SimComponent> for EvolveSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        let config = config(world)?;
        self.settings = config.settings().clone();
        self.rng = config.rng(EVOLVE_STREAM);
        self.filter = Filter::new()
            .require(SimKind::Hunger)
            .optional(SimKind::MoveSpeed)
            .optional(SimKind::Strength)
            .optional(SimKind::Health)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, _dt: f64) {
        let mut rows = ctx.store.query_mut(&self.filter);
        rows.sort_unstable_by_key(|row| row.entity());
        for mut row in rows {
            let Some(hunger) = row.get_as_mut::<Hunger>() else {
                continue;
            };
            if hunger.0 < self.settings.evolve_hunger_value {
                continue;
            }
            hunger.0 -= self.settings.evolve_hunger_cost;

            if let Some(speed) = row.get_as_mut::<MoveSpeed>() {
                speed.0 += (0.75 - self.rng.gen::<f64>()) * 5.0;
            }
            if let Some(strength) = row.get_as_mut::<Strength>() {
                strength.0 += (0.9 - self.rng.gen::<f64>()) * 6.5;
            }
            let mut health_left = true;
            if let Some(health) = row.get_as_mut::<Health>() {
                health.0 += (0.65 - self.rng.gen::<f64>()) * 14.0;
                health_left = health.0 > 0.0;
            }
            debug!(entity = %row.entity(), "creature evolved");
            if !health_left {
                mark_dead(ctx.commands, row.entity(), "a bad mutation");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LifeTimeSystem
// ---------------------------------------------------------------------------

/// Ages entities. The chance of dying of old age each frame grows linearly
/// with age.
pub struct LifeTimeSystem {
    divisor: f64,
    filter: Filter<SimKind>,
    rng: Pcg32,
}

impl Default for LifeTimeSystem {
    fn default() -> Self {
        Self {
            divisor: SimSettings::default().life_time_divisor,
            filter: Filter::new(),
            rng: Pcg32::new(0, LIFE_TIME_STREAM),
        }
    }
}

impl System<SimComponent> for LifeTimeSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        let config = config(world)?;
        self.divisor = config.settings().life_time_divisor;
        self.rng = config.rng(LIFE_TIME_STREAM);
        self.filter = Filter::new().require(SimKind::LifeTime).exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        let mut rows = ctx.store.query_mut(&self.filter);
        rows.sort_unstable_by_key(|row| row.entity());
        for mut row in rows {
            let Some(age) = row.get_as_mut::<LifeTime>() else {
                continue;
            };
            age.0 += dt;
            let chance = age.0 / self.divisor;
            if self.rng.gen::<f64>() <= chance {
                mark_dead(ctx.commands, row.entity(), "old age");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ReproduceSystem
// ---------------------------------------------------------------------------

/// Every `reproduce_delay` seconds, each creature has offspring with
/// `reproduce_chance`, until there are `max_creatures`.
pub struct ReproduceSystem {
    settings: SimSettings,
    time: f64,
    filter: Filter<SimKind>,
    rng: Pcg32,
}

impl Default for ReproduceSystem {
    fn default() -> Self {
        Self {
            settings: SimSettings::default(),
            time: 0.0,
            filter: Filter::new(),
            rng: Pcg32::new(0, REPRODUCE_STREAM),
        }
    }
}

impl System<SimComponent> for ReproduceSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        let config = config(world)?;
        self.settings = config.settings().clone();
        self.rng = config.rng(REPRODUCE_STREAM);
        self.filter = Filter::new()
            .require(SimKind::Team)
            .require(SimKind::MoveSpeed)
            .require(SimKind::Strength)
            .require(SimKind::Health)
            .require(SimKind::Position)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        self.time += dt;
        if self.time < self.settings.reproduce_delay {
            return;
        }
        self.time = 0.0;

        let mut parents: Vec<(EntityId, spawn::Parent)> = ctx
            .store
            .query(&self.filter)
            .iter()
            .filter_map(|row| {
                let parent = spawn::Parent {
                    team: row.get_as::<Team>()?.0,
                    position: row.get_as::<Position>()?.0,
                    speed: row.get_as::<MoveSpeed>()?.0,
                    strength: row.get_as::<Strength>()?.0,
                    health: row.get_as::<Health>()?.0,
                };
                Some((row.entity(), parent))
            })
            .collect();
        parents.sort_unstable_by_key(|(entity, _)| *entity);

        let mut population = creature_count(ctx);
        for (entity, parent) in parents {
            if population >= self.settings.max_creatures {
                break;
            }
            if self.rng.gen::<f64>() > self.settings.reproduce_chance {
                continue;
            }
            population += 1;
            let child = spawn_named(ctx, spawn::offspring(&mut self.rng, &self.settings, &parent));
            debug!(parent = %entity, child = %child, "creature born");
        }
    }
}

// ---------------------------------------------------------------------------
// BotCreationSystem
// ---------------------------------------------------------------------------

/// Adds a named creature on a random team every `bot_create_delay` seconds
/// while there are fewer than `max_creatures`.
pub struct BotCreationSystem {
    settings: SimSettings,
    time: f64,
    rng: Pcg32,
}

impl Default for BotCreationSystem {
    fn default() -> Self {
        Self {
            settings: SimSettings::default(),
            time: 0.0,
            rng: Pcg32::new(0, BOT_STREAM),
        }
    }
}

impl System<SimComponent> for BotCreationSystem {
    fn on_create(&mut self, world: &mut World<SimComponent>) -> Result<(), EcsError> {
        let config = config(world)?;
        self.settings = config.settings().clone();
        self.rng = config.rng(BOT_STREAM);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, dt: f64) {
        self.time += dt;
        if self.time < self.settings.bot_create_delay {
            return;
        }
        self.time = 0.0;

        if creature_count(ctx) >= self.settings.max_creatures {
            return;
        }
        let team = self.rng.gen_range(0..spawn::TEAM_COUNT);
        let bot = spawn_named(ctx, spawn::creature(&mut self.rng, &self.settings, team, None));
        debug!(entity = %bot, team, "bot joined");
    }
}

// ---------------------------------------------------------------------------
// DeathSystem
// ---------------------------------------------------------------------------

/// Marks entities with no health left that nothing else has claimed. An
/// empty stomach means starvation; anything else is put down to wounds.
#[derive(Debug, Default)]
pub struct DeathSystem {
    filter: Filter<SimKind>,
}

impl System<SimComponent> for DeathSystem {
    fn on_create(&mut self, _world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.filter = Filter::new()
            .require(SimKind::Health)
            .optional(SimKind::Hunger)
            .exclude(SimKind::DeadTag);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, _dt: f64) {
        let mut dying: Vec<(EntityId, &str)> = ctx
            .store
            .query(&self.filter)
            .iter()
            .filter(|row| row.get_as::<Health>().is_some_and(|h| h.0 <= 0.0))
            .map(|row| {
                let starved = row.get_as::<Hunger>().is_some_and(|h| h.0 <= 0.0);
                (row.entity(), if starved { "starvation" } else { "wounds" })
            })
            .collect();
        dying.sort_unstable_by_key(|(entity, _)| *entity);
        for (entity, reason) in dying {
            mark_dead(ctx.commands, entity, reason);
        }
    }
}

// ---------------------------------------------------------------------------
// KillSystem
// ---------------------------------------------------------------------------

/// Despawns everything tagged dead. Runs last.
#[derive(Debug, Default)]
pub struct KillSystem {
    filter: Filter<SimKind>,
}

impl System<SimComponent> for KillSystem {
    fn on_create(&mut self, _world: &mut World<SimComponent>) -> Result<(), EcsError> {
        self.filter = Filter::new()
            .require(SimKind::DeadTag)
            .optional(SimKind::EntityName);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Ctx<'_>, _dt: f64) {
        let mut rows = ctx.store.query(&self.filter);
        rows.sort_unstable_by_key(|row| row.entity());
        for row in rows {
            if let Some(EntityName(name)) = row.get_as::<EntityName>() {
                let reason = row
                    .get_as::<DeadTag>()
                    .and_then(|d| d.reason.as_deref())
                    .unwrap_or("unknown causes");
                info!(entity = %row.entity(), name = %name, reason, "creature died");
            }
            ctx.commands.despawn(row.entity());
        }
    }

    fn update_order(&self) -> i32 {
        200
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(settings: SimSettings) -> World<SimComponent> {
        let mut world = World::new();
        world.add_system(ConfigSystem::new(settings, 42)).unwrap();
        world
    }

    fn creature_at(world: &mut World<SimComponent>, position: Vec2) -> EntityId {
        world
            .spawn([
                Position(position).into(),
                TargetPosition(None).into(),
                Hunger(50.0).into(),
                Health(100.0).into(),
                MoveSpeed(5.0).into(),
            ])
            .unwrap()
    }

    // -- 1. Config --

    #[test]
    fn systems_create_default_config_when_missing() {
        let mut world: World<SimComponent> = World::new();
        world.create_system::<HungerSystem>().unwrap();
        assert!(world.has_system::<ConfigSystem>());
        assert_eq!(world.system_names()[0], "ConfigSystem");
    }

    #[test]
    fn config_tracks_elapsed_time() {
        let mut world = world_with(SimSettings::default());
        world.update(0.5);
        world.update(0.25);
        assert_eq!(world.get_system::<ConfigSystem>().unwrap().elapsed(), 0.75);
    }

    #[test]
    fn registry_creates_every_system_once() {
        let mut world = world_with(SimSettings::default());
        let registry = registry();
        let created = world.create_systems(&registry).unwrap();
        assert_eq!(created, registry.len() - 1);
        assert_eq!(world.create_systems(&registry).unwrap(), 0);
        let names = world.system_names();
        assert_eq!(names.first(), Some(&"ConfigSystem"));
        assert_eq!(names.last(), Some(&"KillSystem"));
    }

    // -- 2. Hunger --

    #[test]
    fn starving_creature_loses_health() {
        let settings = SimSettings {
            hunger_tick_delay: 1.0,
            ..SimSettings::default()
        };
        let mut world = world_with(settings);
        world.create_system::<HungerSystem>().unwrap();
        let e = world.spawn([Hunger(0.5).into(), Health(100.0).into()]).unwrap();

        world.update(1.0);
        assert_eq!(world.get_as::<Hunger>(e), Some(&Hunger(0.0)));
        assert_eq!(world.get_as::<Health>(e), Some(&Health(80.0)));
    }

    #[test]
    fn speed_increases_hunger_drain() {
        let settings = SimSettings {
            hunger_tick_delay: 1.0,
            ..SimSettings::default()
        };
        let mut world = world_with(settings);
        world.create_system::<HungerSystem>().unwrap();
        let e = world
            .spawn([Hunger(50.0).into(), Health(100.0).into(), MoveSpeed(4.0).into()])
            .unwrap();

        world.update(0.5);
        assert_eq!(world.get_as::<Hunger>(e), Some(&Hunger(50.0)));
        world.update(0.5);
        assert_eq!(world.get_as::<Hunger>(e), Some(&Hunger(48.0)));
    }

    // -- 3. Movement --

    #[test]
    fn arrival_snaps_and_clears_target() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<MoveToTargetSystem>().unwrap();
        let e = creature_at(&mut world, Vec2::new(0.0, 0.0));
        world.get_as_mut::<TargetPosition>(e).unwrap().0 = Some(Vec2::new(1.0, 0.0));

        world.update(1.0);
        assert_eq!(world.get_as::<Position>(e), Some(&Position(Vec2::new(1.0, 0.0))));
        assert_eq!(world.get_as::<TargetPosition>(e), Some(&TargetPosition(None)));
    }

    #[test]
    fn position_is_clamped_to_world_disc() {
        let settings = SimSettings {
            world_size: 10.0,
            ..SimSettings::default()
        };
        let mut world = world_with(settings);
        world.create_system::<PositionLimitSystem>().unwrap();
        let e = world.spawn([Position(Vec2::new(30.0, 40.0)).into()]).unwrap();

        world.update(0.1);
        let position = world.get_as::<Position>(e).unwrap().0;
        assert!((position.len() - 10.0).abs() < 1e-9);
        assert!((position.x - 6.0).abs() < 1e-9);
    }

    // -- 4. Food and gathering --

    #[test]
    fn food_spawns_in_batches_up_to_max() {
        let settings = SimSettings {
            food_create_delay: 1.0,
            food_batch_size: 4,
            max_food: 10,
            ..SimSettings::default()
        };
        let mut world = world_with(settings);
        world.create_system::<FoodSpawnSystem>().unwrap();
        let bushes = Filter::new().require(SimKind::BushTag);

        for _ in 0..5 {
            world.update(1.0);
        }
        assert_eq!(world.query(&bushes).len(), 8);
    }

    #[test]
    fn gatherer_eats_bush_in_reach() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<GatheringSystem>().unwrap();
        let creature = creature_at(&mut world, Vec2::ZERO);
        let bush = world
            .spawn([Position(Vec2::new(3.0, 4.0)).into(), crate::components::BushTag.into()])
            .unwrap();

        let report = world.update(1.2);
        assert_eq!(report.failed_count, 0);
        assert_eq!(world.get_as::<Hunger>(creature), Some(&Hunger(85.0)));
        assert_eq!(world.get_as::<Health>(creature), Some(&Health(105.0)));
        assert!(world.get_as::<DeadTag>(bush).is_some());
    }

    #[test]
    fn one_bush_feeds_one_creature_per_pass() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<GatheringSystem>().unwrap();
        let first = creature_at(&mut world, Vec2::ZERO);
        let second = creature_at(&mut world, Vec2::new(1.0, 0.0));
        world
            .spawn([Position(Vec2::new(2.0, 0.0)).into(), crate::components::BushTag.into()])
            .unwrap();

        let report = world.update(1.2);
        assert_eq!(report.failed_count, 0);
        let fed = [first, second]
            .iter()
            .filter(|e| world.get_as::<Hunger>(**e) == Some(&Hunger(85.0)))
            .count();
        assert_eq!(fed, 1);
    }

    #[test]
    fn distant_bush_becomes_target() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<GatheringSystem>().unwrap();
        let creature = creature_at(&mut world, Vec2::ZERO);
        world
            .spawn([Position(Vec2::new(100.0, 0.0)).into(), crate::components::BushTag.into()])
            .unwrap();

        world.update(1.2);
        assert_eq!(
            world.get_as::<TargetPosition>(creature),
            Some(&TargetPosition(Some(Vec2::new(100.0, 0.0))))
        );
        assert_eq!(world.get_as::<Hunger>(creature), Some(&Hunger(50.0)));
    }

    // -- 5. Priorities --

    #[test]
    fn hungry_creature_gathers_and_weak_creature_flees() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<PriorityControlSystem>().unwrap();
        let priority = Priority {
            current: Goal::Hunting,
            target: Goal::Hunting,
        };
        let mut spawn = |hunger: f64, health: f64| {
            world
                .spawn([
                    priority.into(),
                    Hunger(hunger).into(),
                    Health(health).into(),
                    MoveSpeed(5.0).into(),
                ])
                .unwrap()
        };
        let hungry = spawn(10.0, 100.0);
        let weak = spawn(150.0, 5.0);
        let fine = spawn(150.0, 100.0);

        world.update(1.0);
        assert_eq!(world.get_as::<Priority>(hungry).unwrap().current, Goal::Gathering);
        assert_eq!(world.get_as::<Priority>(weak).unwrap().current, Goal::Safety);
        assert_eq!(world.get_as::<Priority>(fine).unwrap().current, Goal::Hunting);
        let speed = world.get_as::<MoveSpeed>(fine).unwrap().0;
        assert!((speed - 5.02).abs() < 1e-12);
    }

    #[test]
    fn fleeing_creature_targets_beyond_team_centre() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<RunAwaySystem>().unwrap();
        let priority = Priority {
            current: Goal::Safety,
            target: Goal::Gathering,
        };
        let runner = world
            .spawn([
                priority.into(),
                Position(Vec2::new(2.0, 0.0)).into(),
                TargetPosition(None).into(),
                Team(1).into(),
            ])
            .unwrap();
        world
            .spawn([Position(Vec2::new(4.0, 2.0)).into(), Team(1).into()])
            .unwrap();

        world.update(0.1);
        assert_eq!(
            world.get_as::<TargetPosition>(runner),
            Some(&TargetPosition(Some(Vec2::new(12.0, 4.0))))
        );
    }

    // -- 6. Combat --

    fn fighter(
        world: &mut World<SimComponent>,
        team: u8,
        position: Vec2,
        health: f64,
        strength: f64,
        current: Goal,
    ) -> EntityId {
        world
            .spawn([
                Position(position).into(),
                TargetPosition(None).into(),
                Health(health).into(),
                Strength(strength).into(),
                Hunger(50.0).into(),
                Team(team).into(),
                Priority {
                    current,
                    target: current,
                }
                .into(),
            ])
            .unwrap()
    }

    #[test]
    fn hunter_targets_nearest_enemy_it_can_beat() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<HuntingSystem>().unwrap();
        let hunter = fighter(&mut world, 0, Vec2::ZERO, 100.0, 5.0, Goal::Hunting);
        let gatherer = fighter(&mut world, 0, Vec2::new(1.0, 1.0), 100.0, 5.0, Goal::Gathering);
        fighter(&mut world, 0, Vec2::new(2.0, 0.0), 10.0, 1.0, Goal::Gathering);
        fighter(&mut world, 1, Vec2::new(10.0, 0.0), 1000.0, 5.0, Goal::Gathering);
        fighter(&mut world, 1, Vec2::new(30.0, 0.0), 50.0, 2.0, Goal::Gathering);

        world.update(1.0);
        assert_eq!(world.get_as::<TargetPosition>(hunter), Some(&TargetPosition(None)));

        world.update(0.5);
        assert_eq!(
            world.get_as::<TargetPosition>(hunter),
            Some(&TargetPosition(Some(Vec2::new(30.0, 0.0))))
        );
        assert_eq!(world.get_as::<TargetPosition>(gatherer), Some(&TargetPosition(None)));
    }

    #[test]
    fn killing_blow_feeds_the_killer() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<DamageSystem>().unwrap();
        let killer = fighter(&mut world, 0, Vec2::ZERO, 100.0, 2.0, Goal::Hunting);
        let victim = fighter(&mut world, 1, Vec2::new(5.0, 0.0), 20.0, 1.0, Goal::Gathering);

        let report = world.update(0.5);
        assert_eq!(report.failed_count, 0);
        // 2 strength * 6.5 * 2 while hunting = 26 damage.
        assert_eq!(world.get_as::<Health>(victim), Some(&Health(-6.0)));
        assert_eq!(world.get_as::<Health>(killer), Some(&Health(160.0)));
        assert_eq!(world.get_as::<Hunger>(killer), Some(&Hunger(110.0)));
        let reason = world.get_as::<DeadTag>(victim).and_then(|d| d.reason.clone());
        assert!(reason.is_some_and(|r| KILL_REASONS.contains(&r.as_str())));
    }

    #[test]
    fn survivors_trade_blows() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<DamageSystem>().unwrap();
        let a = fighter(&mut world, 0, Vec2::ZERO, 100.0, 2.0, Goal::Gathering);
        let b = fighter(&mut world, 1, Vec2::new(0.0, 10.0), 100.0, 1.0, Goal::Gathering);

        world.update(0.5);
        assert_eq!(world.get_as::<Health>(a), Some(&Health(93.5)));
        assert_eq!(world.get_as::<Health>(b), Some(&Health(87.0)));
        assert!(world.get_as::<DeadTag>(b).is_none());
    }

    #[test]
    fn allies_and_distant_enemies_are_left_alone() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<DamageSystem>().unwrap();
        let a = fighter(&mut world, 0, Vec2::ZERO, 100.0, 7.0, Goal::Hunting);
        let ally = fighter(&mut world, 0, Vec2::new(1.0, 0.0), 100.0, 7.0, Goal::Hunting);
        let far = fighter(&mut world, 1, Vec2::new(100.0, 0.0), 100.0, 7.0, Goal::Hunting);

        world.update(0.5);
        for e in [a, ally, far] {
            assert_eq!(world.get_as::<Health>(e), Some(&Health(100.0)));
        }
    }

    // -- 7. Population --

    #[test]
    fn reproduction_stops_at_max_creatures() {
        let settings = SimSettings {
            reproduce_delay: 1.0,
            reproduce_chance: 1.0,
            max_creatures: 3,
            ..SimSettings::default()
        };
        let mut world = world_with(settings);
        world.create_system::<ReproduceSystem>().unwrap();
        let first = fighter(&mut world, 3, Vec2::new(7.0, 7.0), 100.0, 2.0, Goal::Gathering);
        world.attach(first, MoveSpeed(4.0).into()).unwrap();
        let second = fighter(&mut world, 1, Vec2::new(-7.0, 0.0), 100.0, 2.0, Goal::Gathering);
        world.attach(second, MoveSpeed(4.0).into()).unwrap();

        let report = world.update(1.0);
        assert_eq!(report.spawned.len(), 1);
        let child = report.spawned[0];
        assert_eq!(world.get_as::<Position>(child), Some(&Position(Vec2::new(7.0, 7.0))));
        assert_eq!(world.get_as::<Team>(child), Some(&Team(3)));
        assert_eq!(
            world.get_as::<EntityName>(child),
            Some(&EntityName(format!("Bot{}", child.slot())))
        );

        let report = world.update(1.0);
        assert!(report.spawned.is_empty());
    }

    #[test]
    fn bots_join_until_max_creatures() {
        let settings = SimSettings {
            bot_create_delay: 1.0,
            max_creatures: 2,
            ..SimSettings::default()
        };
        let mut world = world_with(settings);
        world.create_system::<BotCreationSystem>().unwrap();
        let creatures = Filter::new().require(SimKind::Hunger).require(SimKind::EntityName);

        world.update(0.5);
        assert!(world.query(&creatures).is_empty());
        for _ in 0..4 {
            world.update(1.0);
        }
        assert_eq!(world.query(&creatures).len(), 2);
    }

    // -- 8. Evolution --

    #[test]
    fn evolution_spends_hunger() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<EvolveSystem>().unwrap();
        let e = world.spawn([Hunger(210.0).into(), MoveSpeed(5.0).into()]).unwrap();

        world.update(0.1);
        assert_eq!(world.get_as::<Hunger>(e), Some(&Hunger(120.0)));
        let speed = world.get_as::<MoveSpeed>(e).unwrap().0;
        assert!((1.25..=8.75).contains(&speed));
    }

    // -- 9. Death --

    #[test]
    fn dead_entities_are_removed_the_frame_after_tagging() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<DeathSystem>().unwrap();
        world.create_system::<KillSystem>().unwrap();
        let e = world
            .spawn([
                Health(-1.0).into(),
                Hunger(0.0).into(),
                EntityName("Bot7".to_owned()).into(),
            ])
            .unwrap();

        world.update(0.1);
        assert!(world.is_live(e));
        assert_eq!(
            world.get_as::<DeadTag>(e).and_then(|d| d.reason.as_deref()),
            Some("starvation")
        );

        world.update(0.1);
        assert!(!world.is_live(e));
    }

    #[test]
    fn death_reason_follows_the_cause() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<DeathSystem>().unwrap();
        let starved = world.spawn([Health(-1.0).into(), Hunger(0.0).into()]).unwrap();
        let wounded = world.spawn([Health(-1.0).into(), Hunger(30.0).into()]).unwrap();

        world.update(0.1);
        let reason = |e| world.get_as::<DeadTag>(e).and_then(|d| d.reason.clone());
        assert_eq!(reason(starved).as_deref(), Some("starvation"));
        assert_eq!(reason(wounded).as_deref(), Some("wounds"));
    }

    #[test]
    fn evolving_into_no_health_is_fatal() {
        let mut world = world_with(SimSettings::default());
        world.create_system::<EvolveSystem>().unwrap();
        world.create_system::<DeathSystem>().unwrap();
        let e = world.spawn([Hunger(210.0).into(), Health(-100.0).into()]).unwrap();

        let report = world.update(0.1);
        assert_eq!(report.success_count, 1);
        assert_eq!(
            world.get_as::<DeadTag>(e).and_then(|d| d.reason.as_deref()),
            Some("a bad mutation")
        );
    }

    #[test]
    fn old_age_eventually_kills() {
        let settings = SimSettings {
            life_time_divisor: 1.0,
            ..SimSettings::default()
        };
        let mut world = world_with(settings);
        world.create_system::<LifeTimeSystem>().unwrap();
        let e = world.spawn([LifeTime(0.0).into()]).unwrap();

        world.update(1.0);
        assert!(world.get_as::<DeadTag>(e).is_some());
    }

    #[test]
    fn death_is_queued_once_per_frame() {
        let settings = SimSettings {
            life_time_divisor: 1.0,
            ..SimSettings::default()
        };
        let mut world = world_with(settings);
        world.create_system::<LifeTimeSystem>().unwrap();
        world.create_system::<DeathSystem>().unwrap();
        world.spawn([LifeTime(5.0).into(), Health(0.0).into()]).unwrap();

        let report = world.update(1.0);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_count, 0);
    }
}
