// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//log
pub const ENV_FETCH_PONYFILL_LOG: &str = "FETCH_PONYFILL_LOG";

//host
pub const ENV_FETCH_PONYFILL_HTTP_TIMEOUT: &str = "FETCH_PONYFILL_HTTP_TIMEOUT";
pub const ENV_FETCH_PONYFILL_USER_AGENT: &str = "FETCH_PONYFILL_USER_AGENT";
