//! Feed path configuration.

use super::mode::Mode;

/// Static configuration for one live feed source.
///
/// A feed path pairs a mode with the relative path of its upstream feed
/// and the protocol versions used for the schedule and realtime
/// endpoints. Behavioral quirks that the upstream operators require are
/// carried as per-path flags rather than hardcoded at the use sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPath {
    mode: Mode,
    path: &'static str,
    schedule_version: u8,
    realtime_version: u8,
    /// Vehicles flagged as performing a prior trip are normally dropped;
    /// this path keeps them (operator-specific workaround).
    prior_trip_exempt: bool,
    /// Fixed rolling-stock label for feeds whose vehicles never report a
    /// model of their own.
    fixed_model: Option<&'static str>,
}

impl FeedPath {
    pub const fn new(mode: Mode, path: &'static str, version: u8) -> Self {
        FeedPath {
            mode,
            path,
            schedule_version: version,
            realtime_version: version,
            prior_trip_exempt: false,
            fixed_model: None,
        }
    }

    pub const fn with_realtime_version(mut self, version: u8) -> Self {
        self.realtime_version = version;
        self
    }

    pub const fn with_prior_trip_exempt(mut self) -> Self {
        self.prior_trip_exempt = true;
        self
    }

    pub const fn with_fixed_model(mut self, model: &'static str) -> Self {
        self.fixed_model = Some(model);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The relative feed path as it appears in upstream URLs.
    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn schedule_version(&self) -> u8 {
        self.schedule_version
    }

    pub fn realtime_version(&self) -> u8 {
        self.realtime_version
    }

    pub fn prior_trip_exempt(&self) -> bool {
        self.prior_trip_exempt
    }

    pub fn fixed_model(&self) -> Option<&'static str> {
        self.fixed_model
    }

    /// The path with separators stripped, used as the prefix for the
    /// reference tables belonging to this feed.
    pub fn working_name(&self) -> String {
        self.path.replace('/', "")
    }
}

/// The NSW feed paths served by this deployment.
pub fn nsw_feed_paths() -> &'static [FeedPath] {
    static PATHS: [FeedPath; 22] = [
        FeedPath::new(Mode::Train, "sydneytrains", 1).with_realtime_version(2),
        FeedPath::new(Mode::TrainLink, "nswtrains", 1),
        FeedPath::new(Mode::Metro, "metro", 2),
        FeedPath::new(Mode::Bus, "regionbuses/centralwestandorana", 1),
        FeedPath::new(Mode::Bus, "regionbuses/centralwestandorana2", 1),
        FeedPath::new(Mode::Bus, "regionbuses/newenglandnorthwest", 1),
        FeedPath::new(Mode::Bus, "regionbuses/northcoast", 1),
        FeedPath::new(Mode::Bus, "regionbuses/northcoast2", 1),
        FeedPath::new(Mode::Bus, "regionbuses/northcoast3", 1),
        FeedPath::new(Mode::Bus, "regionbuses/riverinamurray", 1),
        FeedPath::new(Mode::Bus, "regionbuses/riverinamurray2", 1),
        FeedPath::new(Mode::Bus, "regionbuses/southeasttablelands", 1),
        FeedPath::new(Mode::Bus, "regionbuses/southeasttablelands2", 1),
        FeedPath::new(Mode::Bus, "regionbuses/sydneysurrounds", 1),
        FeedPath::new(Mode::Bus, "regionbuses/newcastlehunter", 1),
        FeedPath::new(Mode::Bus, "regionbuses/farwest", 1),
        FeedPath::new(Mode::LightRail, "lightrail/cbdandsoutheast", 1),
        FeedPath::new(Mode::LightRail, "lightrail/innerwest", 1)
            .with_fixed_model("Citadis X05/CAF Urbos 3"),
        FeedPath::new(Mode::LightRail, "lightrail/newcastle", 1).with_prior_trip_exempt(),
        FeedPath::new(Mode::LightRail, "lightrail/parramatta", 1),
        FeedPath::new(Mode::Ferry, "ferries/sydneyferries", 1),
        FeedPath::new(Mode::Bus, "buses", 1),
    ];
    &PATHS
}

/// Feed paths serving a given mode.
pub fn paths_for_mode(mode: Mode) -> impl Iterator<Item = &'static FeedPath> {
    nsw_feed_paths().iter().filter(move |p| p.mode() == mode)
}
