//! Headless state for the storefront's interactive widgets.

pub mod ad_carousel;
pub mod payment_frame;
pub mod viewer;

pub use ad_carousel::{
    AdCarousel, BannerSource, BannerTarget, CarouselState, CarouselView, ConnectionStatus,
};
pub use payment_frame::{
    FrameMessage, FrameOptions, FrameProbe, FrameState, PaymentFrame, ProbeError,
};
pub use viewer::{Key, Viewer360};
