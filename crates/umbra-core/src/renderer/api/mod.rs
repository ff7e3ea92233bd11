// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Plain data types exchanged with a [`GraphicsBackend`](super::GraphicsBackend).

pub mod buffer;
pub mod constants;
pub mod data;
pub mod fence;
pub mod handles;
pub mod target;

pub use self::buffer::*;
pub use self::constants::*;
pub use self::data::*;
pub use self::fence::*;
pub use self::handles::*;
pub use self::target::*;
