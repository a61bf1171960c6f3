mod ids;
mod link;
mod visit;

pub use ids::{generate_link_id, generate_visit_id, LINK_ID_LEN, VISIT_ID_LEN};
pub use link::{CreateLinkRequest, CreateLinkResponse, Link, LinkSummary};
pub use visit::{
    PreciseLocation, RequestHeaders, UpdateLocationRequest, VisitRecord, DIRECT_REFERER,
    PRECISE_LOCATION_SOURCE,
};
