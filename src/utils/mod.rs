// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
pub mod class;
pub mod module;
pub mod object;
pub mod primordials;
pub mod promise;
pub mod result;
