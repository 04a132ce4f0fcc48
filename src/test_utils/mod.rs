#![allow(missing_docs)]

pub(crate) mod fake_client;
pub(crate) mod html;
pub(crate) mod navigator;

pub(crate) use fake_client::FakeClient;
pub(crate) use html::{assert_valid_html, parse_html_fragment, select_all, select_text};
pub(crate) use navigator::RecordingNavigator;
