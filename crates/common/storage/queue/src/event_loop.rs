// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

/// Externally owned asynchronous execution facility used by buffered
/// read/write modes.
///
/// The builder and the queue only carry the reference through to the
/// engine. Neither of them starts, stops or closes the loop; its lifetime
/// belongs to the caller that created it.
pub trait EventLoop: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn start(&self);

    fn stop(&self);

    fn is_closed(&self) -> bool;
}
