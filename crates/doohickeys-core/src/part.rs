//! The part catalog and per-instance part state.
//!
//! Every part tag maps to one static [`PartKind`] row describing how the part
//! attaches, what it can connect through, and which behavioural traits it
//! has. The table is pure data: simulation stages look traits up by tag and
//! never dispatch on the instance.

use serde::{Deserialize, Serialize};

use crate::grid::{AttachmentSide, Footprint, GridPosition, Rotation};
use crate::id::PartId;
use crate::physics::Vec2;

// ---------------------------------------------------------------------------
// Connection types
// ---------------------------------------------------------------------------

/// The kind of link two adjacent parts share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Welded joint. Also conducts heat.
    Rigid,
    /// Free-rotating joint (wings, legs).
    Hinged,
    /// Wheel or gear shaft.
    Axle,
    /// Steam pipe.
    Steam,
    /// Copper wire.
    Electrical,
    /// Pneumatic tube.
    Pneumatic,
    /// Chain or belt drive.
    Chain,
    /// Magnetic coupling.
    Magnetic,
}

impl ConnectionType {
    /// Order used to pick one type when two parts share several. Specialised
    /// transmission links win over plain structural ones.
    pub const PRIORITY: [ConnectionType; 8] = [
        ConnectionType::Steam,
        ConnectionType::Electrical,
        ConnectionType::Chain,
        ConnectionType::Axle,
        ConnectionType::Pneumatic,
        ConnectionType::Magnetic,
        ConnectionType::Rigid,
        ConnectionType::Hinged,
    ];

    /// Whether rotation travels along this link.
    pub fn is_drive(self) -> bool {
        matches!(self, ConnectionType::Chain | ConnectionType::Axle)
    }
}

// ---------------------------------------------------------------------------
// Categories and tags
// ---------------------------------------------------------------------------

/// Toolbox grouping of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartCategory {
    Structural,
    Locomotion,
    Power,
    Mechanical,
    Electrical,
    Triggers,
    Special,
}

/// The type tag of a part. Each tag has exactly one catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    // Structural
    BrassFrame,
    IronFrame,
    WoodenFrame,
    CopperPlate,
    ReinforcedFrame,
    // Locomotion
    CogWheel,
    SpikedWheel,
    TankTread,
    PropellerBlade,
    OrnithopterWing,
    SpringLeg,
    // Power
    SteamBoiler,
    CoalFurnace,
    ClockworkMotor,
    TeslaCoil,
    WindupSpring,
    PressureTank,
    // Mechanical
    SmallGear,
    LargeGear,
    GearBox,
    Piston,
    Crankshaft,
    Flywheel,
    BeltDrive,
    // Electrical
    CopperWire,
    Capacitor,
    SparkGap,
    #[serde(rename = "em_coil")]
    ElectromagneticCoil,
    LightningRod,
    ArcLamp,
    // Triggers
    PressurePlate,
    Tripwire,
    TimerSwitch,
    SteamValve,
    PneumaticTube,
    Bellows,
    Cannon,
    Dynamite,
    // Special
    HotAirBalloon,
    Parachute,
    GrappleHook,
    MagneticAttractor,
    Gyroscope,
    KameraMan,
}

impl PartType {
    pub const COUNT: usize = 44;

    /// The controlled character whose survival decides the run.
    pub const CHARACTER: PartType = PartType::KameraMan;

    /// Every tag in catalog order.
    pub fn all() -> impl Iterator<Item = PartType> {
        CATALOG.iter().map(|kind| kind.part_type)
    }

    /// Catalog row for this tag.
    pub fn kind(self) -> &'static PartKind {
        &CATALOG[self as usize]
    }

    /// The stable snake_case tag, e.g. `"steam_boiler"`.
    pub fn tag(self) -> &'static str {
        self.kind().tag
    }

    /// Look up a tag by its snake_case name.
    pub fn from_tag(tag: &str) -> Option<PartType> {
        CATALOG.iter().find(|k| k.tag == tag).map(|k| k.part_type)
    }

    /// Human-readable name derived from the tag ("steam_boiler" -> "Steam Boiler").
    pub fn display_name(self) -> String {
        self.tag()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for PartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Catalog row
// ---------------------------------------------------------------------------

/// Static attributes of a part type. Never mutated at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct PartKind {
    pub part_type: PartType,
    pub tag: &'static str,
    pub category: PartCategory,
    /// Attachment sides before the placement rotation is applied.
    pub attachment_sides: &'static [AttachmentSide],
    pub connection_types: &'static [ConnectionType],
    pub mass: f64,
    /// Footprint before the placement rotation is applied.
    pub footprint: Footprint,
    /// Can originate a power network.
    pub is_powered: bool,
    /// Must be reachable from a power source to function.
    pub requires_power: bool,
    /// Ignites when hot and explodes with the larger ordnance blast.
    pub flammable: bool,
    /// Destroyed outright in the inner half of a blast.
    pub fragile: bool,
    /// Pulled by energised electromagnetic coils.
    pub ferrous: bool,
    /// Attracts tesla arcs.
    pub arc_target: bool,
    /// Fires its trigger when struck by an arc or stepped on.
    pub contact_trigger: bool,
    /// Holds charge by design and never overloads.
    pub charge_store: bool,
    pub description: &'static str,
}

impl PartKind {
    const fn new(
        part_type: PartType,
        tag: &'static str,
        category: PartCategory,
        attachment_sides: &'static [AttachmentSide],
        connection_types: &'static [ConnectionType],
        mass: f64,
        description: &'static str,
    ) -> Self {
        Self {
            part_type,
            tag,
            category,
            attachment_sides,
            connection_types,
            mass,
            footprint: Footprint::single(),
            is_powered: false,
            requires_power: false,
            flammable: false,
            fragile: false,
            ferrous: false,
            arc_target: false,
            contact_trigger: false,
            charge_store: false,
            description,
        }
    }

    const fn size(mut self, width: u32, height: u32) -> Self {
        self.footprint = Footprint::new(width, height);
        self
    }

    const fn powered(mut self) -> Self {
        self.is_powered = true;
        self
    }

    const fn needs_power(mut self) -> Self {
        self.requires_power = true;
        self
    }

    const fn flammable(mut self) -> Self {
        self.flammable = true;
        self
    }

    const fn fragile(mut self) -> Self {
        self.fragile = true;
        self
    }

    const fn ferrous(mut self) -> Self {
        self.ferrous = true;
        self
    }

    const fn arc_target(mut self) -> Self {
        self.arc_target = true;
        self
    }

    const fn contact_trigger(mut self) -> Self {
        self.contact_trigger = true;
        self
    }

    const fn charge_store(mut self) -> Self {
        self.charge_store = true;
        self
    }

    /// Whether this kind shares at least one connection type with `other`.
    pub fn compatible_with(&self, other: &PartKind) -> bool {
        self.connection_types
            .iter()
            .any(|t| other.connection_types.contains(t))
    }

    /// The highest-priority connection type both kinds support.
    pub fn shared_connection(&self, other: &PartKind) -> Option<ConnectionType> {
        ConnectionType::PRIORITY.into_iter().find(|t| {
            self.connection_types.contains(t) && other.connection_types.contains(t)
        })
    }

    pub fn supports(&self, connection_type: ConnectionType) -> bool {
        self.connection_types.contains(&connection_type)
    }
}

use AttachmentSide::{Bottom, Left, Right, Top};
use ConnectionType::{Axle, Chain, Electrical, Hinged, Magnetic, Pneumatic, Rigid, Steam};
use PartCategory as Cat;

const ALL_SIDES: &[AttachmentSide] = &[Top, Right, Bottom, Left];

/// One row per [`PartType`], indexed by discriminant.
static CATALOG: [PartKind; PartType::COUNT] = [
    // -- Structural --
    PartKind::new(PartType::BrassFrame, "brass_frame", Cat::Structural, ALL_SIDES, &[Rigid, Hinged], 1.0,
        "Standard lightweight frame."),
    PartKind::new(PartType::IronFrame, "iron_frame", Cat::Structural, ALL_SIDES, &[Rigid, Hinged], 2.0,
        "Heavy frame. Strong, and pulled by magnets.").ferrous(),
    PartKind::new(PartType::WoodenFrame, "wooden_frame", Cat::Structural, ALL_SIDES, &[Rigid, Hinged], 0.5,
        "Light frame that splinters in a blast.").fragile(),
    PartKind::new(PartType::CopperPlate, "copper_plate", Cat::Structural, ALL_SIDES, &[Rigid, Electrical], 1.0,
        "Conducts electricity and heat.").arc_target(),
    PartKind::new(PartType::ReinforcedFrame, "reinforced_frame", Cat::Structural, ALL_SIDES, &[Rigid, Hinged], 2.0,
        "Heavy frame for load-bearing joints."),
    // -- Locomotion --
    PartKind::new(PartType::CogWheel, "cog_wheel", Cat::Locomotion, &[Top], &[Axle], 0.3,
        "Wheel driven through its axle.").needs_power(),
    PartKind::new(PartType::SpikedWheel, "spiked_wheel", Cat::Locomotion, &[Top], &[Axle], 0.5,
        "Wheel that grips rough terrain.").needs_power(),
    PartKind::new(PartType::TankTread, "tank_tread", Cat::Locomotion, &[Top], &[Axle], 1.5,
        "Tread with traction on any surface.").size(2, 1).needs_power(),
    PartKind::new(PartType::PropellerBlade, "propeller_blade", Cat::Locomotion, &[Bottom], &[Axle, Hinged], 0.2,
        "Generates thrust while spinning.").needs_power(),
    PartKind::new(PartType::OrnithopterWing, "ornithopter_wing", Cat::Locomotion, &[Left, Right], &[Axle, Hinged], 0.2,
        "Flapping wing.").size(2, 1).needs_power(),
    PartKind::new(PartType::SpringLeg, "spring_leg", Cat::Locomotion, &[Top], &[Hinged], 0.4,
        "Bouncy leg."),
    // -- Power --
    PartKind::new(PartType::SteamBoiler, "steam_boiler", Cat::Power, ALL_SIDES, &[Rigid, Steam, Pneumatic], 2.5,
        "Raises steam once heated past boiling.").size(1, 2).powered(),
    PartKind::new(PartType::CoalFurnace, "coal_furnace", Cat::Power, &[Top, Left, Right], &[Rigid], 3.0,
        "Burns fuel to heat whatever touches it.").size(1, 2).powered(),
    PartKind::new(PartType::ClockworkMotor, "clockwork_motor", Cat::Power, &[Top, Bottom], &[Rigid, Chain], 1.5,
        "Pre-wound motor with a steady output.").powered(),
    PartKind::new(PartType::TeslaCoil, "tesla_coil", Cat::Power, &[Bottom], &[Electrical, Rigid], 2.0,
        "Builds charge and throws arcs.").powered().charge_store(),
    PartKind::new(PartType::WindupSpring, "windup_spring", Cat::Power, &[Top, Bottom], &[Rigid, Chain], 1.0,
        "Releases stored energy as rotation once armed.").powered(),
    PartKind::new(PartType::PressureTank, "pressure_tank", Cat::Power, &[Left, Right, Bottom], &[Rigid, Steam, Pneumatic], 2.5,
        "Holds steam pressure, leaking slowly."),
    // -- Mechanical --
    PartKind::new(PartType::SmallGear, "small_gear", Cat::Mechanical, &[Left, Right], &[Chain, Axle], 0.3,
        "Fast, low-torque gear.").ferrous(),
    PartKind::new(PartType::LargeGear, "large_gear", Cat::Mechanical, &[Left, Right], &[Chain, Axle], 0.5,
        "Slow, high-torque gear.").ferrous(),
    PartKind::new(PartType::GearBox, "gear_box", Cat::Mechanical, ALL_SIDES, &[Chain, Axle, Rigid], 0.8,
        "Routes rotation in any direction."),
    PartKind::new(PartType::Piston, "piston", Cat::Mechanical, &[Top, Bottom], &[Steam, Rigid], 0.6,
        "Turns steam pressure into stored motion."),
    PartKind::new(PartType::Crankshaft, "crankshaft", Cat::Mechanical, &[Left, Right], &[Chain, Axle, Rigid], 0.8,
        "Turns linear motion into rotation."),
    PartKind::new(PartType::Flywheel, "flywheel", Cat::Mechanical, &[Left, Right], &[Chain, Axle], 1.0,
        "Banks rotation and gives it back."),
    PartKind::new(PartType::BeltDrive, "belt_drive", Cat::Mechanical, &[Left, Right], &[Chain], 0.2,
        "Carries rotation between shafts."),
    // -- Electrical --
    PartKind::new(PartType::CopperWire, "copper_wire", Cat::Electrical, ALL_SIDES, &[Electrical], 0.1,
        "Conducts electricity.").arc_target(),
    PartKind::new(PartType::Capacitor, "capacitor", Cat::Electrical, &[Left, Right], &[Electrical, Rigid], 0.5,
        "Stores charge, bleeding it slowly.").charge_store(),
    PartKind::new(PartType::SparkGap, "spark_gap", Cat::Electrical, &[Left, Right], &[Electrical, Rigid], 0.3,
        "Releases a discharge.").needs_power(),
    PartKind::new(PartType::ElectromagneticCoil, "em_coil", Cat::Electrical, &[Top, Bottom], &[Electrical, Rigid], 0.7,
        "Pulls iron while charged.").needs_power(),
    PartKind::new(PartType::LightningRod, "lightning_rod", Cat::Electrical, &[Bottom], &[Electrical, Rigid], 0.4,
        "Attracts arcs.").arc_target(),
    PartKind::new(PartType::ArcLamp, "arc_lamp", Cat::Electrical, &[Bottom, Left, Right], &[Electrical, Rigid], 0.3,
        "Lights up when charged.").needs_power(),
    // -- Triggers --
    PartKind::new(PartType::PressurePlate, "pressure_plate", Cat::Triggers, &[Bottom], &[Rigid, Electrical], 0.2,
        "Fires when weight lands on it.").contact_trigger(),
    PartKind::new(PartType::Tripwire, "tripwire", Cat::Triggers, &[Left, Right], &[Rigid, Electrical], 0.2,
        "Fires when touched.").contact_trigger(),
    PartKind::new(PartType::TimerSwitch, "timer_switch", Cat::Triggers, ALL_SIDES, &[Rigid, Electrical], 0.3,
        "Fires after a countdown."),
    PartKind::new(PartType::SteamValve, "steam_valve", Cat::Triggers, ALL_SIDES, &[Rigid, Steam, Pneumatic], 0.4,
        "Blocks steam while closed."),
    PartKind::new(PartType::PneumaticTube, "pneumatic_tube", Cat::Triggers, &[Left, Right], &[Rigid, Steam, Pneumatic], 0.3,
        "Carries small objects."),
    PartKind::new(PartType::Bellows, "bellows", Cat::Triggers, &[Bottom, Left, Right], &[Rigid, Pneumatic, Hinged], 0.3,
        "Puffs air when triggered."),
    PartKind::new(PartType::Cannon, "cannon", Cat::Triggers, &[Bottom, Left, Right], &[Rigid, Steam], 2.0,
        "Fires a projectile when triggered.").needs_power(),
    PartKind::new(PartType::Dynamite, "dynamite", Cat::Triggers, ALL_SIDES, &[Rigid], 0.5,
        "Explodes when triggered or heated.").flammable(),
    // -- Special --
    PartKind::new(PartType::HotAirBalloon, "hot_air_balloon", Cat::Special, &[Bottom], &[Rigid], 0.1,
        "Lifts when heated.").size(2, 2),
    PartKind::new(PartType::Parachute, "parachute", Cat::Special, &[Bottom], &[Rigid], 0.1,
        "Slows a fall."),
    PartKind::new(PartType::GrappleHook, "grapple_hook", Cat::Special, &[Bottom, Left, Right], &[Rigid, Chain], 0.5,
        "Latches onto surfaces."),
    PartKind::new(PartType::MagneticAttractor, "magnetic_attractor", Cat::Special, &[Bottom], &[Magnetic, Electrical], 1.5,
        "Attracts metal objects."),
    PartKind::new(PartType::Gyroscope, "gyroscope", Cat::Special, &[Bottom], &[Rigid], 1.0,
        "Keeps the contraption upright."),
    PartKind::new(PartType::KameraMan, "kamera_man", Cat::Special, &[Bottom], &[Rigid], 1.5,
        "The photographer riding the contraption. Keep them in one piece."),
];

// ---------------------------------------------------------------------------
// Per-instance state
// ---------------------------------------------------------------------------

/// Ambient temperature every part starts at and cools towards.
pub const AMBIENT_TEMPERATURE: f64 = 20.0;

/// Full durability of an undamaged part.
pub const FULL_DURABILITY: f64 = 100.0;

/// Mutable physical state of one placed part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartState {
    pub steam_pressure: f64,
    pub temperature: f64,
    pub electric_charge: f64,
    pub rotation_speed: f64,
    pub mechanical_energy: f64,
    /// Edge-triggered; consumed once per tick.
    pub is_triggered: bool,
    /// Level flag: valve open, motor running, furnace lit, lamp on.
    pub is_active: bool,
    /// The part is destroyed once this reaches zero.
    pub durability: f64,
}

impl Default for PartState {
    fn default() -> Self {
        Self {
            steam_pressure: 0.0,
            temperature: AMBIENT_TEMPERATURE,
            electric_charge: 0.0,
            rotation_speed: 0.0,
            mechanical_energy: 0.0,
            is_triggered: false,
            is_active: false,
            durability: FULL_DURABILITY,
        }
    }
}

impl PartState {
    pub fn is_destroyed(&self) -> bool {
        self.durability <= 0.0
    }
}

/// A part placed on the build grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub part_type: PartType,
    /// Cell of the footprint origin.
    pub position: GridPosition,
    pub rotation: Rotation,
    pub flipped: bool,
    pub state: PartState,
}

impl Part {
    pub fn kind(&self) -> &'static PartKind {
        self.part_type.kind()
    }

    /// Footprint after applying the placement rotation.
    pub fn footprint(&self) -> Footprint {
        self.kind().footprint.rotated(self.rotation)
    }

    /// Attachment sides after applying the placement rotation.
    pub fn attachment_sides(&self) -> impl Iterator<Item = AttachmentSide> + '_ {
        rotated_sides(self.part_type, self.rotation)
    }

    pub fn attaches_on(&self, side: AttachmentSide) -> bool {
        self.attachment_sides().any(|s| s == side)
    }

    pub fn cells(&self) -> impl Iterator<Item = GridPosition> {
        self.footprint().cells(self.position)
    }

    pub fn occupies(&self, cell: GridPosition) -> bool {
        self.cells().any(|c| c == cell)
    }

    /// World-space position of the footprint origin.
    pub fn world_position(&self, cell_size: f64) -> Vec2 {
        Vec2::new(
            self.position.x as f64 * cell_size,
            self.position.y as f64 * cell_size,
        )
    }

    pub fn is_character(&self) -> bool {
        self.part_type == PartType::CHARACTER
    }
}

/// Catalog attachment sides of `part_type` turned by `rotation`.
pub fn rotated_sides(
    part_type: PartType,
    rotation: Rotation,
) -> impl Iterator<Item = AttachmentSide> {
    let steps = rotation.steps();
    part_type
        .kind()
        .attachment_sides
        .iter()
        .map(move |side| side.rotated(steps))
}
