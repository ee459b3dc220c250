pub mod packet;
pub mod protocols;
pub mod statistics;

pub use packet::{AnalysisError, PacketRecord, RawPacketRecord};
pub use protocols::protocol_name;
pub use statistics::{IpPairEntry, IpPairProtocolEntry, ProtocolDistributionEntry, TrafficAggregator, TrafficSummary};
