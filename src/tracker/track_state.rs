/// Track state enumeration for the tracklet lifecycle.
///
/// `Probation -> Confirmed -> Lost`, with `Probation -> Lost` also allowed.
/// No other transition exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Newly created track, not yet confirmed
    #[default]
    Probation,
    /// Track that reached the required hit streak; never reverts
    Confirmed,
    /// Removed from tracking, terminal
    Lost,
}
