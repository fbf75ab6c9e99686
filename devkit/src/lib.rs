/*!
# Scanboard DevKit - Stubs et utilitaires de test pour le proxy

- Stub Censys en mémoire (`CensysApi`) avec injection d'échecs/délais
- Faux serveur Censys HTTP pour tester le client reqwest
- Fixtures (buckets, corps JSON, identifiants)
- Lancement du proxy sur port éphémère
*/

pub mod fixtures;
pub mod mock_upstream;
pub mod test_utils;
pub mod upstream_stub;

pub use fixtures::{test_credentials, ReferenceData};
pub use mock_upstream::{CannedReply, MockUpstream};
pub use test_utils::{spawn_proxy, spawn_stub_proxy, RunningProxy};
pub use upstream_stub::{StubCall, StubCensys};
